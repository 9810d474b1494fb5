//! Private `@`-data frame: a chained scope carrying iteration metadata and
//! any state a helper chooses to stash there (§4.2).
//!
//! `DataFrame::get` intentionally does NOT port the deep dotted-path walk
//! the distillation source used (`DataFrame.find`) -- that method's own
//! comment flagged it as inconsistent with expression-time path
//! resolution. Instead it reuses the same per-context field resolution as
//! ordinary context lookups, so private data and context data behave
//! identically (see SPEC_FULL.md §4.2).

use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct DataFrame {
  parent: Option<Rc<DataFrame>>,
  data: HashMap<String, Value>,
}

impl DataFrame {
  pub fn new() -> Self {
    Self::default()
  }

  /// Shallow-clones `parent`'s data into a new frame whose parent is
  /// `parent` itself.
  pub fn child(parent: &Rc<DataFrame>) -> Self {
    Self {
      parent: Some(Rc::clone(parent)),
      data: parent.data.clone(),
    }
  }

  pub fn new_iter_frame(parent: &Rc<DataFrame>, length: usize, index: usize, key: Option<Value>) -> Self {
    let mut frame = Self::child(parent);
    frame.set("index", Value::Number(index as f64));
    frame.set("key", key.unwrap_or(Value::Nil));
    frame.set("first", Value::Bool(index == 0));
    frame.set("last", Value::Bool(length == 0 || index == length - 1));
    frame
  }

  pub fn set(&mut self, key: impl Into<String>, value: Value) {
    self.data.insert(key.into(), value);
  }

  pub fn parent(&self) -> Option<&Rc<DataFrame>> {
    self.parent.as_ref()
  }

  /// Resolves a dotted path against this frame's data, one field per part,
  /// exactly like `Evaluator::eval_part` would against a Mapping context.
  /// An unresolvable part yields `Value::Nil`, never an error.
  pub fn get(&self, parts: &[&str]) -> Value {
    let mut current = Value::Mapping(Rc::new(self.data.clone()));
    for raw_part in parts {
      let part = strip_segment_literal(raw_part);
      match current.get_field(part) {
        Some(value) => current = value,
        None => return Value::Nil,
      }
    }
    current
  }
}

pub fn strip_segment_literal(part: &str) -> &str {
  if part.len() >= 2 && part.starts_with('[') && part.ends_with(']') {
    &part[1..part.len() - 1]
  } else {
    part
  }
}
