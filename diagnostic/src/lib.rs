pub mod error;

pub use error::{HelperError, RenderError};

/// A short, human-readable rendering of whatever AST node the evaluator was
/// visiting when an error occurred. Unlike a compiler diagnostic, this is not
/// backed by a source span -- the AST this crate serves has none -- so it is
/// just the node's own `Display` text, captured at the moment of failure.
pub type NodeDescription = String;
