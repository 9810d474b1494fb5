//! The object a block helper receives alongside its evaluated arguments
//! (§6). It bundles the already-evaluated params/hash with just enough of
//! the evaluator to let the helper render its own body -- `Fn`, `FnWith`,
//! `FnData`, `FnCtxData`, `Inverse`, `NewDataFrame` -- without handing the
//! helper the evaluator's full internal state.

use std::collections::HashMap;
use std::rc::Rc;

use diagnostic::RenderError;

use crate::ast::Program;
use crate::data_frame::DataFrame;
use crate::eval::Evaluator;
use crate::value::Value;

pub struct Options<'e, 'r, 'n> {
  eval: &'e mut Evaluator<'r>,
  program: Option<&'n Program>,
  inverse: Option<&'n Program>,
  params: Vec<Value>,
  hash: HashMap<String, Value>,
}

impl<'e, 'r, 'n> Options<'e, 'r, 'n> {
  pub fn new(
    eval: &'e mut Evaluator<'r>,
    program: Option<&'n Program>,
    inverse: Option<&'n Program>,
    params: Vec<Value>,
    hash: HashMap<String, Value>,
  ) -> Self {
    Self { eval, program, inverse, params, hash }
  }

  pub fn params(&self) -> &[Value] {
    &self.params
  }

  pub fn param(&self, index: usize) -> Value {
    self.params.get(index).cloned().unwrap_or(Value::Nil)
  }

  pub fn hash(&self) -> &HashMap<String, Value> {
    &self.hash
  }

  /// The description of whatever node is currently being evaluated, for a
  /// helper that wants to raise its own `RenderError::HelperFailed`.
  pub fn current_node(&self) -> &str {
    self.eval.current_node()
  }

  pub fn hash_str(&self, key: &str) -> String {
    self.hash.get(key).map(Value::stringify).unwrap_or_default()
  }

  /// Looks `key` up as a single field on the current context, without
  /// invoking the full path-resolution machinery.
  pub fn value(&self, key: &str) -> Value {
    self.eval.current_context().get_field(key).unwrap_or(Value::Nil)
  }

  pub fn value_str(&self, key: &str) -> String {
    self.value(key).stringify()
  }

  pub fn data(&self, key: &str) -> Value {
    self.eval.data_frame().get(&[key])
  }

  pub fn data_str(&self, key: &str) -> String {
    self.data(key).stringify()
  }

  /// A fresh private-data frame chained off the one active now, for helpers
  /// that need to stash per-iteration metadata before rendering.
  pub fn new_data_frame(&self) -> Rc<DataFrame> {
    Rc::new(DataFrame::child(self.eval.data_frame_rc()))
  }

  /// Renders the consequent body against the current context and data,
  /// with `block_param_values` bound to the program's declared block
  /// parameter names, positionally.
  pub fn render_fn_params(&mut self, block_param_values: Vec<Value>) -> Result<String, RenderError> {
    let Some(program) = self.program else { return Ok(String::new()) };
    self.eval.render_program(program, None, None, block_param_values)
  }

  pub fn render_fn(&mut self) -> Result<String, RenderError> {
    self.render_fn_params(Vec::new())
  }

  pub fn render_fn_with(&mut self, context: Value) -> Result<String, RenderError> {
    let Some(program) = self.program else { return Ok(String::new()) };
    self.eval.render_program(program, Some(context), None, Vec::new())
  }

  pub fn render_fn_data(&mut self, data: Rc<DataFrame>) -> Result<String, RenderError> {
    let Some(program) = self.program else { return Ok(String::new()) };
    self.eval.render_program(program, None, Some(data), Vec::new())
  }

  pub fn render_fn_ctx_data(&mut self, context: Value, data: Rc<DataFrame>) -> Result<String, RenderError> {
    let Some(program) = self.program else { return Ok(String::new()) };
    self.eval.render_program(program, Some(context), Some(data), Vec::new())
  }

  pub fn render_inverse(&mut self) -> Result<String, RenderError> {
    let Some(inverse) = self.inverse else { return Ok(String::new()) };
    self.eval.render_program(inverse, None, None, Vec::new())
  }
}
