//! The evaluating `Visitor`: walks the AST against a real context stack and
//! produces rendered output (§4.3-4.7, §4.9). Grounded on the distillation
//! source's `evalVisitor`, with the Go-specific bookkeeping it needed
//! (a node-identity memoization table, a manual expression stack) replaced
//! by ordinary Rust ownership -- see SPEC_FULL.md §3/§9.

use std::collections::HashMap;
use std::rc::Rc;

use diagnostic::RenderError;

use crate::ast::{self, ExprNode, Expression, PathExpression, Program, Visitor};
use crate::data_frame::{strip_segment_literal, DataFrame};
use crate::html;
use crate::options::Options;
use crate::registry::{HelperRegistry, PartialRegistry};
use crate::value::{Callable, ParamKind, Value};

pub struct Evaluator<'r> {
  helpers: &'r HelperRegistry,
  partials: &'r PartialRegistry,
  context_stack: Vec<Value>,
  data_frame: Rc<DataFrame>,
  block_params: Vec<HashMap<String, Value>>,
  current_node: String,
}

impl<'r> Evaluator<'r> {
  pub fn new(root: Value, helpers: &'r HelperRegistry, partials: &'r PartialRegistry) -> Self {
    Self {
      helpers,
      partials,
      context_stack: vec![root],
      data_frame: Rc::new(DataFrame::new()),
      block_params: Vec::new(),
      current_node: String::new(),
    }
  }

  pub fn with_data(mut self, data: DataFrame) -> Self {
    self.data_frame = Rc::new(data);
    self
  }

  pub fn current_context(&self) -> &Value {
    self.context_stack.last().expect("context stack is seeded at construction and never fully drained")
  }

  pub fn current_node(&self) -> &str {
    &self.current_node
  }

  pub fn data_frame(&self) -> &DataFrame {
    &self.data_frame
  }

  pub fn data_frame_rc(&self) -> &Rc<DataFrame> {
    &self.data_frame
  }

  pub fn render(&mut self, program: &Program) -> Result<String, RenderError> {
    Ok(program.accept(self)?.stringify())
  }

  /// Renders `program` after optionally rebinding context, private data and
  /// declared block-parameter names -- the shared machinery behind every
  /// `Options::render_fn*` variant.
  pub fn render_program(
    &mut self,
    program: &Program,
    context: Option<Value>,
    data: Option<Rc<DataFrame>>,
    block_param_values: Vec<Value>,
  ) -> Result<String, RenderError> {
    let pushed_context = context.is_some();
    if let Some(ctx) = context {
      self.context_stack.push(ctx);
    }
    let prior_data = data.map(|frame| std::mem::replace(&mut self.data_frame, frame));

    let mut frame = HashMap::new();
    for (name, value) in program.block_params.iter().zip(block_param_values) {
      frame.insert(name.clone(), value);
    }
    self.block_params.push(frame);

    let result = program.accept(self);

    self.block_params.pop();
    if let Some(prior) = prior_data {
      self.data_frame = prior;
    }
    if pushed_context {
      self.context_stack.pop();
    }

    Ok(result?.stringify())
  }

  fn find_block_param(&self, name: &str) -> Option<Value> {
    self.block_params.iter().rev().find_map(|frame| frame.get(name).cloned())
  }

  fn eval_params(&mut self, params: &[ExprNode]) -> Result<Vec<Value>, RenderError> {
    params.iter().map(|p| p.accept(self)).collect()
  }

  fn eval_hash(&mut self, hash: Option<&ast::Hash>) -> Result<HashMap<String, Value>, RenderError> {
    let mut out = HashMap::new();
    if let Some(hash) = hash {
      for pair in &hash.pairs {
        out.insert(pair.key.clone(), pair.value.accept(self)?);
      }
    }
    Ok(out)
  }

  fn walk_fields(&self, root: Value, parts: &[String]) -> Value {
    let mut current = root;
    for raw in parts {
      let part = strip_segment_literal(raw);
      match current.get_field(part).or_else(|| current.param_helper(part)) {
        Some(value) => current = value,
        None => return Value::Nil,
      }
    }
    current
  }

  fn eval_ctx_path(&self, depth: usize) -> Value {
    let index = self.context_stack.len().saturating_sub(1 + depth);
    self.context_stack.get(index).cloned().unwrap_or(Value::Nil)
  }

  fn eval_data_path(&self, path: &PathExpression) -> Value {
    if path.is_data_root() {
      // An explicitly-passed `root` entry in private data takes priority
      // over the context stack's own root (the root context a render call
      // started with may be nil, as when only private data was supplied).
      let parts: Vec<&str> = path.parts.iter().map(String::as_str).collect();
      let from_data = self.data_frame.get(&parts);
      if !matches!(from_data, Value::Nil) {
        return from_data;
      }
      let root = self.context_stack.first().cloned().unwrap_or(Value::Nil);
      return self.walk_fields(root, &path.parts[1..]);
    }
    let mut frame: &DataFrame = &self.data_frame;
    for _ in 0..path.depth {
      match frame.parent() {
        Some(parent) => frame = &**parent,
        None => break,
      }
    }
    let parts: Vec<&str> = path.parts.iter().map(String::as_str).collect();
    frame.get(&parts)
  }

  /// §4.3's precedence: a block parameter of the same name wins over
  /// ordinary context lookup; failing that, dotted names are tried against
  /// every ancestor context frame (innermost first) in turn -- "context
  /// precedence" for names a nearer frame doesn't have.
  fn eval_path_expression(&mut self, path: &PathExpression) -> Result<Value, RenderError> {
    self.current_node = path.original.clone();

    let resolved = if path.data {
      self.eval_data_path(path)
    } else if path.parts.is_empty() {
      self.eval_ctx_path(path.depth)
    } else if path.depth == 0 && self.find_block_param(&path.parts[0]).is_some() {
      let bound = self.find_block_param(&path.parts[0]).unwrap();
      self.walk_fields(bound, &path.parts[1..])
    } else {
      let innermost = self.context_stack.len().saturating_sub(1 + path.depth);
      let mut found = Value::Nil;
      for i in (0..=innermost).rev() {
        let ctx = self.context_stack[i].clone();
        let first = self.walk_fields(ctx.clone(), &path.parts[..1]);
        if !matches!(first, Value::Nil) {
          // The first segment resolved here: stop walking ancestors even if
          // a deeper segment turns out nil -- that nil is the final answer.
          found = self.walk_fields(ctx, &path.parts);
          break;
        }
      }
      found
    };

    self.fire_if_callable(resolved)
  }

  /// A field/path reference that resolves to a zero-arity callable (e.g. a
  /// `Record` method used as a computed property) is invoked in place,
  /// matching the method-invocation convention in SPEC_FULL.md §4.1.
  fn fire_if_callable(&self, value: Value) -> Result<Value, RenderError> {
    match &value {
      Value::Callable(callable) if callable.arity() == 0 && !callable.is_variadic() => callable.call(&[], None),
      _ => Ok(value),
    }
  }

  fn coerce_param(&self, name: &str, index: usize, value: Value, kind: ParamKind) -> Result<Value, RenderError> {
    match kind {
      ParamKind::Any => Ok(value),
      ParamKind::Bool => Ok(Value::Bool(value.is_truthy())),
      ParamKind::String => match value {
        Value::Callable(_) => Err(RenderError::TypeMismatch {
          name: name.to_string(),
          index,
          expected: "string",
          node: self.current_node.clone(),
        }),
        other => Ok(Value::String(other.stringify())),
      },
    }
  }

  fn call_helper(
    &mut self,
    name: &str,
    helper: Rc<dyn Callable>,
    params: &[ExprNode],
    hash: Option<&ast::Hash>,
    program: Option<&Program>,
    inverse: Option<&Program>,
  ) -> Result<Value, RenderError> {
    let args = self.eval_params(params)?;
    let hash_values = self.eval_hash(hash)?;

    if !helper.is_variadic() && args.len() != helper.arity() {
      tracing::warn!(helper = %name, expected = helper.arity(), got = args.len(), "helper arity mismatch");
      return Err(RenderError::ArityMismatch {
        name: name.to_string(),
        expected: helper.arity(),
        got: args.len(),
        node: self.current_node.clone(),
      });
    }
    tracing::trace!(helper = %name, arg_count = args.len(), "invoking helper");

    let coerced = args
      .into_iter()
      .enumerate()
      .map(|(i, value)| self.coerce_param(name, i, value, helper.param_kind(i)))
      .collect::<Result<Vec<_>, _>>()?;

    let mut options = helper
      .wants_options()
      .then(|| Options::new(self, program, inverse, coerced.clone(), hash_values));

    let result = helper.call(&coerced, options.as_mut());
    drop(options);
    result
  }
}

fn indent_lines(indent: &str, text: &str) -> String {
  if indent.is_empty() || text.is_empty() {
    return text.to_string();
  }
  let mut out = String::with_capacity(text.len() + indent.len());
  for line in text.split_inclusive('\n') {
    out.push_str(indent);
    out.push_str(line);
  }
  out
}

impl<'r> Visitor for Evaluator<'r> {
  type Output = Result<Value, RenderError>;

  fn visit_program(&mut self, node: &Program) -> Self::Output {
    let mut buffer = String::new();
    for stmt in &node.body {
      buffer.push_str(&stmt.accept(self)?.stringify());
    }
    Ok(Value::SafeString(buffer))
  }

  fn visit_mustache(&mut self, node: &ast::MustacheStatement) -> Self::Output {
    let value = node.expression.accept(self)?;
    let text = value.stringify();
    let rendered = if node.unescaped || value.is_safe_string() {
      text
    } else {
      html::escape(&text)
    };
    Ok(Value::SafeString(rendered))
  }

  fn visit_block(&mut self, node: &ast::BlockStatement) -> Self::Output {
    let expr = &node.expression;
    self.current_node = expr.to_string();

    if let Some(name) = expr.helper_name(true) {
      if let Some(helper) = self.helpers.get(name) {
        let value = self.call_helper(
          name,
          helper,
          &expr.params,
          expr.hash.as_ref(),
          node.program.as_ref(),
          node.inverse.as_ref(),
        )?;
        return Ok(Value::SafeString(value.stringify()));
      }
    }

    // No registered helper under this name: fall back to a bare
    // truthy/array dispatch, keeping the surrounding context unchanged (an
    // "if"-shaped default). A block invoked with an argument (`{{#if x}}`,
    // `{{#each x}}`) tests/iterates that argument; one invoked bare
    // (`{{#flag}}`, the plain Mustache-section form) tests its own path.
    let condition = match expr.params.first() {
      Some(first) => first.accept(self)?,
      None => self.eval_path_expression(&expr.path)?,
    };

    if let Some(items) = condition.as_sequence() {
      if items.is_empty() {
        return self.render_inverse_or_empty(node.inverse.as_ref());
      }
      let len = items.len();
      let mut buffer = String::new();
      for (index, item) in items.to_vec().into_iter().enumerate() {
        let frame = Rc::new(DataFrame::new_iter_frame(&self.data_frame, len, index, None));
        if let Some(program) = &node.program {
          let bound = vec![item.clone(), Value::Number(index as f64)];
          buffer.push_str(&self.render_program(program, Some(item), Some(frame), bound)?);
        }
      }
      return Ok(Value::SafeString(buffer));
    }

    if condition.is_truthy() {
      match &node.program {
        Some(program) => Ok(Value::SafeString(self.render_program(program, None, None, Vec::new())?)),
        None => Ok(Value::SafeString(String::new())),
      }
    } else {
      self.render_inverse_or_empty(node.inverse.as_ref())
    }
  }

  fn visit_partial(&mut self, node: &ast::PartialStatement) -> Self::Output {
    self.current_node = "partial".to_string();

    let name = match &node.name {
      ast::PartialName::Path(path) => path.original.clone(),
      ast::PartialName::Sub(sub) => match sub.accept(self)? {
        Value::String(s) | Value::SafeString(s) => s,
        _ => {
          return Err(RenderError::PartialNameType {
            node: self.current_node.clone(),
          })
        }
      },
    };

    let Some(partial) = self.partials.get(&name) else {
      tracing::warn!(partial = %name, "partial not registered");
      return Err(RenderError::PartialResolution {
        reason: format!("no partial registered as '{name}'"),
        node: self.current_node.clone(),
      });
    };

    let context = match node.params.first() {
      Some(expr) => expr.accept(self)?,
      None => self.current_context().clone(),
    };

    let context = match (&node.hash, context) {
      (Some(hash), Value::Mapping(map)) => {
        let overlay = self.eval_hash(Some(hash))?;
        let mut merged = (*map).clone();
        merged.extend(overlay);
        Value::mapping(merged)
      }
      (_, other) => other,
    };

    let rendered = self.render_program(partial.program(), Some(context), None, Vec::new())?;
    Ok(Value::SafeString(indent_lines(&node.indent, &rendered)))
  }

  fn visit_content(&mut self, node: &ast::ContentStatement) -> Self::Output {
    Ok(Value::SafeString(node.value.clone()))
  }

  fn visit_comment(&mut self, _node: &ast::CommentStatement) -> Self::Output {
    Ok(Value::SafeString(String::new()))
  }

  fn visit_expression(&mut self, node: &Expression) -> Self::Output {
    self.current_node = node.to_string();

    // A bare single identifier is always checked against the helper
    // registry first, even with no params/hash (a zero-arg helper like
    // `{{hello}}`) -- only a registry miss falls back to field lookup.
    if let Some(name) = node.literal_str() {
      if let Some(helper) = self.helpers.get(name) {
        return self.call_helper(name, helper, &node.params, node.hash.as_ref(), None, None);
      }
    }

    self.eval_path_expression(&node.path)
  }

  fn visit_sub_expression(&mut self, node: &ast::SubExpression) -> Self::Output {
    node.expression.accept(self)
  }

  fn visit_path(&mut self, node: &PathExpression) -> Self::Output {
    self.eval_path_expression(node)
  }

  fn visit_string(&mut self, node: &ast::StringLiteral) -> Self::Output {
    Ok(Value::string(node.value.clone()))
  }

  fn visit_boolean(&mut self, node: &ast::BooleanLiteral) -> Self::Output {
    Ok(Value::Bool(node.value))
  }

  fn visit_number(&mut self, node: &ast::NumberLiteral) -> Self::Output {
    Ok(Value::Number(node.value))
  }

  fn visit_hash(&mut self, node: &ast::Hash) -> Self::Output {
    let mut map = HashMap::new();
    for pair in &node.pairs {
      map.insert(pair.key.clone(), pair.value.accept(self)?);
    }
    Ok(Value::mapping(map))
  }

  fn visit_hash_pair(&mut self, node: &ast::HashPair) -> Self::Output {
    node.value.accept(self)
  }
}

impl<'r> Evaluator<'r> {
  fn render_inverse_or_empty(&mut self, inverse: Option<&Program>) -> Result<Value, RenderError> {
    match inverse {
      Some(program) => Ok(Value::SafeString(self.render_program(program, None, None, Vec::new())?)),
      None => Ok(Value::SafeString(String::new())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::*;
  use crate::value::NativeHelper;

  fn path(parts: &[&str]) -> PathExpression {
    PathExpression::new(parts.join("."), 0, false, parts.iter().map(|s| s.to_string()).collect())
  }

  fn mapping_ctx(pairs: &[(&str, Value)]) -> Value {
    Value::mapping(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
  }

  #[test]
  fn resolves_nested_dotted_path() {
    let ctx = mapping_ctx(&[("user", mapping_ctx(&[("name", Value::string("Ada"))]))]);
    let helpers = HelperRegistry::new();
    let partials = PartialRegistry::new();
    let mut eval = Evaluator::new(ctx, &helpers, &partials);
    let result = eval.visit_path(&path(&["user", "name"])).unwrap();
    assert_eq!(result.stringify(), "Ada");
  }

  #[test]
  fn missing_path_is_nil_not_an_error() {
    let ctx = mapping_ctx(&[]);
    let helpers = HelperRegistry::new();
    let partials = PartialRegistry::new();
    let mut eval = Evaluator::new(ctx, &helpers, &partials);
    let result = eval.visit_path(&path(&["ghost", "field"])).unwrap();
    assert!(matches!(result, Value::Nil));
  }

  #[test]
  fn helper_arity_mismatch_is_an_error() {
    let ctx = Value::Nil;
    let mut helpers = HelperRegistry::new();
    helpers.register("upper", NativeHelper::new(1, |args, _| Ok(Value::string(args[0].stringify().to_uppercase()))));
    let partials = PartialRegistry::new();
    let mut eval = Evaluator::new(ctx, &helpers, &partials);

    let expr = Expression {
      path: path(&["upper"]),
      params: vec![
        ExprNode::String(StringLiteral { value: "a".into() }),
        ExprNode::String(StringLiteral { value: "b".into() }),
      ],
      hash: None,
    };
    let err = eval.visit_expression(&expr).unwrap_err();
    assert!(matches!(err, RenderError::ArityMismatch { .. }));
  }

  #[test]
  fn block_parameter_shadows_context_field() {
    let ctx = mapping_ctx(&[("bee", Value::string("outer"))]);
    let helpers = HelperRegistry::new();
    let partials = PartialRegistry::new();
    let mut eval = Evaluator::new(ctx, &helpers, &partials);
    eval.block_params.push([("bee".to_string(), Value::string("inner"))].into_iter().collect());
    let result = eval.visit_path(&path(&["bee"])).unwrap();
    assert_eq!(result.stringify(), "inner");
  }
}
