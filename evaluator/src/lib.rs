//! A Handlebars/Mustache-compatible expression evaluation engine: given a
//! parsed template and a context value, renders text or extracts the shape
//! of the data the template expects.

pub mod ast;
pub mod context_tracker;
pub mod data_frame;
pub mod eval;
pub mod extract;
pub mod html;
pub mod options;
pub mod registry;
pub mod value;

use diagnostic::RenderError;

use crate::ast::Program;
use crate::data_frame::DataFrame;
use crate::eval::Evaluator;
use crate::extract::Extractor;
use crate::registry::{HelperRegistry, PartialRegistry};
use crate::value::{Callable, Value};

/// A parsed template, its own registered helpers and partials, ready to be
/// rendered against any number of contexts.
#[derive(Default)]
pub struct Template {
  program: Program,
  helpers: HelperRegistry,
  partials: PartialRegistry,
}

impl Template {
  pub fn new(program: Program) -> Self {
    Self {
      program,
      helpers: HelperRegistry::new(),
      partials: PartialRegistry::new(),
    }
  }

  pub fn program(&self) -> &Program {
    &self.program
  }

  pub fn register_helper(&mut self, name: impl Into<String>, helper: impl Callable + 'static) {
    self.helpers.register(name, helper);
  }

  pub fn register_partial(&mut self, name: impl Into<String>, partial: Template) {
    self.partials.register(name, partial);
  }

  pub fn render(&self, context: Value) -> Result<String, RenderError> {
    self.render_with_data(context, DataFrame::new())
  }

  #[tracing::instrument(skip_all)]
  pub fn render_with_data(&self, context: Value, data: DataFrame) -> Result<String, RenderError> {
    let mut evaluator = Evaluator::new(context, &self.helpers, &self.partials).with_data(data);
    evaluator.render(&self.program)
  }

  /// Walks the template with no real context and returns the nested
  /// mapping of stub values every referenced path would need (§4.8).
  pub fn extract(&self) -> Value {
    tracing::debug!("extracting referenced paths");
    let mut extractor = Extractor::new();
    self.program.accept(&mut extractor);
    extractor.into_value()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::*;
  use crate::value::NativeHelper;
  use std::collections::HashMap;

  fn bare_expr(parts: &[&str]) -> Expression {
    Expression {
      path: PathExpression::new(parts.join("."), 0, false, parts.iter().map(|s| s.to_string()).collect()),
      params: vec![],
      hash: None,
    }
  }

  #[test]
  fn renders_a_simple_mustache() {
    let program = Program::new(vec![
      Statement::Content(ContentStatement { value: "Hello, ".into() }),
      Statement::Mustache(MustacheStatement { expression: bare_expr(&["name"]), unescaped: false }),
      Statement::Content(ContentStatement { value: "!".into() }),
    ]);
    let template = Template::new(program);
    let ctx = Value::mapping(HashMap::from([("name".to_string(), Value::string("<world>"))]));
    let rendered = template.render(ctx).unwrap();
    assert_eq!(rendered, "Hello, &lt;world&gt;!");
  }

  #[test]
  fn unescaped_mustache_passes_through_raw_html() {
    let program = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["markup"]),
      unescaped: true,
    })]);
    let template = Template::new(program);
    let ctx = Value::mapping(HashMap::from([("markup".to_string(), Value::string("<b>hi</b>"))]));
    assert_eq!(template.render(ctx).unwrap(), "<b>hi</b>");
  }

  #[test]
  fn block_without_registered_helper_falls_back_to_truthy_dispatch() {
    let program = Program::new(vec![Statement::Block(BlockStatement {
      expression: Expression { path: PathExpression::new("flag", 0, false, vec!["flag".into()]), params: vec![], hash: None },
      program: Some(Program::new(vec![Statement::Content(ContentStatement { value: "yes".into() })])),
      inverse: Some(Program::new(vec![Statement::Content(ContentStatement { value: "no".into() })])),
    })]);
    let template = Template::new(program);

    let truthy = Value::mapping(HashMap::from([("flag".to_string(), Value::Bool(true))]));
    assert_eq!(template.render(truthy).unwrap(), "yes");

    let falsy = Value::mapping(HashMap::from([("flag".to_string(), Value::Bool(false))]));
    assert_eq!(template.render(falsy).unwrap(), "no");
  }

  #[test]
  fn registered_helper_receives_evaluated_arguments() {
    let program = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: Expression {
        path: PathExpression::new("shout", 0, false, vec!["shout".into()]),
        params: vec![ExprNode::Path(PathExpression::new("name", 0, false, vec!["name".into()]))],
        hash: None,
      },
      unescaped: false,
    })]);
    let mut template = Template::new(program);
    template.register_helper(
      "shout",
      NativeHelper::new(1, |args, _| Ok(Value::string(format!("{}!", args[0].stringify().to_uppercase())))),
    );
    let ctx = Value::mapping(HashMap::from([("name".to_string(), Value::string("ada"))]));
    assert_eq!(template.render(ctx).unwrap(), "ADA!");
  }

  #[test]
  fn extract_reports_the_shape_of_referenced_paths() {
    let program = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["user", "email"]),
      unescaped: false,
    })]);
    let template = Template::new(program);
    let extracted = template.extract();
    let user = extracted.get_field("user").unwrap();
    assert_eq!(user.get_field("email").unwrap().stringify(), "test_email");
  }
}
