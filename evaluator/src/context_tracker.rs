//! The extractor's private bookkeeping: a stack of qualified path prefixes,
//! each optionally bound to a block-parameter alias (`as |x|`), used to
//! reconstruct fully-qualified data paths while walking the AST without any
//! real data (§4.8). This is a from-scratch, spec-faithful reimplementation
//! of the alias-rewriting idea in the distillation source's context member
//! walker -- not a line-for-line port, and deliberately single-level (an
//! alias resolves against the innermost active frame only), per the
//! "pin behavior to tested scenarios" resolution in SPEC_FULL.md §9.

use std::collections::HashSet;

struct Frame {
  path: Vec<String>,
  alias: Option<String>,
}

#[derive(Default)]
pub struct ContextTracker {
  frames: Vec<Frame>,
  /// Full qualified paths of every `#each`-shaped frame ever pushed, so the
  /// accumulator can wrap the right subtree as a one-element sequence.
  iteration_paths: HashSet<Vec<String>>,
}

impl ContextTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Qualifies `parts` (already stripped of `this`/`.` sentinels) against
  /// `depth` levels of ancestor frames.
  pub fn resolve(&self, parts: &[String], depth: usize) -> Vec<String> {
    let len = self.frames.len();
    let dropped = depth.min(len);
    let active = &self.frames[..len - dropped];

    if parts.is_empty() {
      return active.last().map(|f| f.path.clone()).unwrap_or_default();
    }

    match active.last() {
      Some(top) => {
        if top.alias.as_deref() == Some(parts[0].as_str()) {
          let mut resolved = top.path.clone();
          resolved.extend_from_slice(&parts[1..]);
          resolved
        } else {
          let mut resolved = top.path.clone();
          resolved.extend_from_slice(parts);
          resolved
        }
      }
      None => parts.to_vec(),
    }
  }

  pub fn push(&mut self, path: Vec<String>, alias: Option<String>, iteration: bool) {
    if iteration {
      self.iteration_paths.insert(path.clone());
    }
    self.frames.push(Frame { path, alias });
  }

  pub fn pop(&mut self) {
    self.frames.pop();
  }

  pub fn is_iteration_path(&self, path: &[String]) -> bool {
    self.iteration_paths.contains(path)
  }
}
