use crate::NodeDescription;

/// A failure that aborts a render or extraction pass.
///
/// Category 1 of the evaluator's error surface (an unresolved path) is not
/// represented here: it resolves to `Value::Nil` and never reaches this type.
/// Everything below is fatal for the current render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
  #[error("helper '{name}' called with wrong number of arguments, needed {expected} but got {got} (at {node})")]
  ArityMismatch {
    name: String,
    expected: usize,
    got: usize,
    node: NodeDescription,
  },

  #[error("helper '{name}' called with argument {index} of the wrong type, expected {expected} (at {node})")]
  TypeMismatch {
    name: String,
    index: usize,
    expected: &'static str,
    node: NodeDescription,
  },

  #[error("{reason} (at {node})")]
  PartialResolution { reason: String, node: NodeDescription },

  #[error("partial name did not evaluate to a string (at {node})")]
  PartialNameType { node: NodeDescription },

  #[error("helper '{name}' failed: {source} (at {node})")]
  HelperFailed {
    name: String,
    node: NodeDescription,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl RenderError {
  pub fn node(&self) -> &str {
    match self {
      Self::ArityMismatch { node, .. }
      | Self::TypeMismatch { node, .. }
      | Self::PartialResolution { node, .. }
      | Self::PartialNameType { node }
      | Self::HelperFailed { node, .. } => node,
    }
  }

  pub fn helper_failed(name: impl Into<String>, node: impl Into<NodeDescription>, source: impl HelperError) -> Self {
    Self::HelperFailed {
      name: name.into(),
      node: node.into(),
      source: Box::new(source),
    }
  }
}

/// Any error a host helper may fail with (category 6, §7); wrapped into
/// `RenderError::HelperFailed` at the call boundary rather than forcing
/// every helper author to construct a `RenderError` directly.
pub trait HelperError: std::error::Error + Send + Sync + 'static {}

impl<T: std::error::Error + Send + Sync + 'static> HelperError for T {}
