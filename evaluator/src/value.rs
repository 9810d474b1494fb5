//! The tagged runtime-value model: the systems-language replacement for the
//! source's reflective value introspection (see SPEC_FULL.md §9).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use diagnostic::{HelperError, RenderError};

use crate::options::Options;

/// A host-visible template value. Every variant is read-only to the
/// evaluator; helpers may construct new ones but never mutate one in place.
#[derive(Clone)]
pub enum Value {
  Nil,
  Bool(bool),
  Number(f64),
  String(String),
  /// Pre-escaped output: a Mustache statement must not re-escape it.
  SafeString(String),
  Sequence(Rc<Vec<Value>>),
  Mapping(Rc<HashMap<String, Value>>),
  Record(Rc<dyn Record>),
  Callable(Rc<dyn Callable>),
}

impl Value {
  pub fn string(s: impl Into<String>) -> Self {
    Self::String(s.into())
  }

  pub fn safe_string(s: impl Into<String>) -> Self {
    Self::SafeString(s.into())
  }

  pub fn sequence(items: Vec<Value>) -> Self {
    Self::Sequence(Rc::new(items))
  }

  pub fn mapping(entries: HashMap<String, Value>) -> Self {
    Self::Mapping(Rc::new(entries))
  }

  /// §4.6 truthiness rules.
  pub fn is_truthy(&self) -> bool {
    match self {
      Self::Nil => false,
      Self::Bool(b) => *b,
      Self::Number(n) => *n != 0.0,
      Self::String(s) | Self::SafeString(s) => !s.is_empty(),
      Self::Sequence(s) => !s.is_empty(),
      Self::Mapping(_) | Self::Record(_) | Self::Callable(_) => true,
    }
  }

  pub fn as_sequence(&self) -> Option<&[Value]> {
    match self {
      Self::Sequence(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_callable(&self) -> Option<Rc<dyn Callable>> {
    match self {
      Self::Callable(c) => Some(Rc::clone(c)),
      _ => None,
    }
  }

  pub fn is_safe_string(&self) -> bool {
    matches!(self, Self::SafeString(_))
  }

  /// Shallow field/key/index lookup, per §4.1. Does not invoke callables:
  /// the caller decides whether a resolved `Value::Callable` should fire,
  /// based on whether the lookup sits at an expression root (§4.3).
  pub fn get_field(&self, name: &str) -> Option<Value> {
    match self {
      Self::Mapping(map) => map.get(name).cloned(),
      Self::Record(record) => record
        .field(name)
        .or_else(|| record.method(name).map(Value::Callable)),
      Self::Sequence(items) => name.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
      _ => None,
    }
  }

  /// §4.1 "param helpers": pseudo-fields consulted only after a direct
  /// lookup fails.
  pub fn param_helper(&self, name: &str) -> Option<Value> {
    match name {
      "length" => match self {
        Self::Sequence(items) => Some(Value::Number(items.len() as f64)),
        Self::Mapping(map) => Some(Value::Number(map.len() as f64)),
        Self::String(s) | Self::SafeString(s) => Some(Value::Number(s.chars().count() as f64)),
        _ => None,
      },
      _ => None,
    }
  }

  /// §6 `Str`: the host-stringification rule.
  pub fn stringify(&self) -> String {
    match self {
      Self::Nil => String::new(),
      Self::Bool(b) => b.to_string(),
      Self::Number(n) => format_number(*n),
      Self::String(s) | Self::SafeString(s) => s.clone(),
      Self::Sequence(items) => items.iter().map(Value::stringify).collect(),
      Self::Mapping(_) | Self::Record(_) => format!("{self:?}"),
      Self::Callable(_) => String::new(),
    }
  }
}

/// Shortest round-trip-ish decimal: integral values print without a
/// trailing `.0`, matching how Handlebars/Mustache render numeric context
/// values. Canonical float formatting beyond this is explicitly out of
/// scope (it belongs to the pretty-printer, not the evaluator).
fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    format!("{n}")
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Nil => write!(f, "Nil"),
      Self::Bool(b) => write!(f, "Bool({b})"),
      Self::Number(n) => write!(f, "Number({n})"),
      Self::String(s) => write!(f, "String({s:?})"),
      Self::SafeString(s) => write!(f, "SafeString({s:?})"),
      Self::Sequence(items) => f.debug_list().entries(items.iter()).finish(),
      Self::Mapping(map) => f.debug_map().entries(map.iter()).finish(),
      Self::Record(r) => write!(f, "Record({})", r.type_name()),
      Self::Callable(_) => write!(f, "Callable(<fn>)"),
    }
  }
}

/// A named-field host value, optionally exposing methods that are invoked
/// exactly like registered helpers (§4.1's method-invocation contract).
pub trait Record {
  fn field(&self, name: &str) -> Option<Value>;

  fn method(&self, _name: &str) -> Option<Rc<dyn Callable>> {
    None
  }

  fn type_name(&self) -> &'static str {
    "record"
  }
}

/// The declared "shape" of one positional parameter slot, used to drive the
/// coercion rules in §4.5. `Any` accepts whatever was evaluated without
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
  Any,
  String,
  Bool,
}

/// Anything invocable by name from a template: a registered helper, a
/// record method, or a data value that happens to be a function.
pub trait Callable {
  fn arity(&self) -> usize;

  fn is_variadic(&self) -> bool {
    false
  }

  fn wants_options(&self) -> bool {
    true
  }

  fn param_kind(&self, _index: usize) -> ParamKind {
    ParamKind::Any
  }

  fn call(&self, args: &[Value], options: Option<&mut Options<'_, '_, '_>>) -> Result<Value, RenderError>;
}

/// A `Callable` built from a plain Rust closure, for helpers that don't
/// warrant a dedicated type -- the common case.
pub struct NativeHelper<F> {
  arity: usize,
  variadic: bool,
  wants_options: bool,
  param_kinds: Vec<ParamKind>,
  func: F,
}

impl<F> NativeHelper<F>
where
  F: Fn(&[Value], Option<&mut Options<'_, '_, '_>>) -> Result<Value, RenderError>,
{
  pub fn new(arity: usize, func: F) -> Self {
    Self {
      arity,
      variadic: false,
      wants_options: true,
      param_kinds: Vec::new(),
      func,
    }
  }

  pub fn variadic(mut self, variadic: bool) -> Self {
    self.variadic = variadic;
    self
  }

  pub fn wants_options(mut self, wants: bool) -> Self {
    self.wants_options = wants;
    self
  }

  pub fn param_kinds(mut self, kinds: Vec<ParamKind>) -> Self {
    self.param_kinds = kinds;
    self
  }
}

impl<F> Callable for NativeHelper<F>
where
  F: Fn(&[Value], Option<&mut Options<'_, '_, '_>>) -> Result<Value, RenderError>,
{
  fn arity(&self) -> usize {
    self.arity
  }

  fn is_variadic(&self) -> bool {
    self.variadic
  }

  fn wants_options(&self) -> bool {
    self.wants_options
  }

  fn param_kind(&self, index: usize) -> ParamKind {
    self.param_kinds.get(index).copied().unwrap_or(ParamKind::Any)
  }

  fn call(&self, args: &[Value], options: Option<&mut Options<'_, '_, '_>>) -> Result<Value, RenderError> {
    (self.func)(args, options)
  }
}

/// A `Callable` whose closure may fail with any host error type rather than
/// constructing a `RenderError` directly -- the failure is wrapped into
/// `RenderError::HelperFailed` at this call boundary (§10.1).
pub struct FallibleHelper<F> {
  name: String,
  arity: usize,
  variadic: bool,
  wants_options: bool,
  param_kinds: Vec<ParamKind>,
  func: F,
}

impl<F, E> FallibleHelper<F>
where
  F: Fn(&[Value], Option<&mut Options<'_, '_, '_>>) -> Result<Value, E>,
  E: HelperError,
{
  pub fn new(name: impl Into<String>, arity: usize, func: F) -> Self {
    Self {
      name: name.into(),
      arity,
      variadic: false,
      wants_options: true,
      param_kinds: Vec::new(),
      func,
    }
  }

  pub fn variadic(mut self, variadic: bool) -> Self {
    self.variadic = variadic;
    self
  }

  pub fn wants_options(mut self, wants: bool) -> Self {
    self.wants_options = wants;
    self
  }

  pub fn param_kinds(mut self, kinds: Vec<ParamKind>) -> Self {
    self.param_kinds = kinds;
    self
  }
}

impl<F, E> Callable for FallibleHelper<F>
where
  F: Fn(&[Value], Option<&mut Options<'_, '_, '_>>) -> Result<Value, E>,
  E: HelperError,
{
  fn arity(&self) -> usize {
    self.arity
  }

  fn is_variadic(&self) -> bool {
    self.variadic
  }

  fn wants_options(&self) -> bool {
    self.wants_options
  }

  fn param_kind(&self, index: usize) -> ParamKind {
    self.param_kinds.get(index).copied().unwrap_or(ParamKind::Any)
  }

  fn call(&self, args: &[Value], options: Option<&mut Options<'_, '_, '_>>) -> Result<Value, RenderError> {
    let node = options.as_ref().map(|o| o.current_node().to_string()).unwrap_or_else(|| self.name.clone());
    (self.func)(args, options).map_err(|e| RenderError::helper_failed(self.name.clone(), node, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fmt;

  #[derive(Debug)]
  struct BoomError;

  impl fmt::Display for BoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "boom")
    }
  }

  impl std::error::Error for BoomError {}

  #[test]
  fn fallible_helper_wraps_host_error_into_helper_failed() {
    let helper = FallibleHelper::new("explode", 0, |_args, _opts| -> Result<Value, BoomError> { Err(BoomError) });
    let err = helper.call(&[], None).unwrap_err();
    assert!(matches!(err, RenderError::HelperFailed { .. }));
  }

  #[test]
  fn truthy_rules_match_mustache_semantics() {
    assert!(!Value::Nil.is_truthy());
    assert!(!Value::Number(0.0).is_truthy());
    assert!(Value::sequence(vec![Value::Bool(true)]).is_truthy());
    assert!(!Value::sequence(vec![]).is_truthy());
  }
}
