//! The non-evaluating `Visitor`: walks the AST with no real data at all and
//! accumulates the shape of every context/data path it would have needed,
//! nested back into a mapping of stub values (§4.8). Grounded on the
//! distillation source's JSON-visitor test corpus; the alias bookkeeping
//! lives in `context_tracker`.

use std::collections::HashMap;

use crate::ast::{self, ExprNode, Expression, PathExpression, Program, Visitor};
use crate::context_tracker::ContextTracker;
use crate::value::Value;

enum StubNode {
  Leaf(String),
  Branch(HashMap<String, StubNode>),
}

impl StubNode {
  fn branch_mut(&mut self) -> &mut HashMap<String, StubNode> {
    if !matches!(self, StubNode::Branch(_)) {
      *self = StubNode::Branch(HashMap::new());
    }
    match self {
      StubNode::Branch(map) => map,
      StubNode::Leaf(_) => unreachable!(),
    }
  }
}

pub struct Extractor {
  tracker: ContextTracker,
  root: StubNode,
}

impl Default for Extractor {
  fn default() -> Self {
    Self {
      tracker: ContextTracker::new(),
      root: StubNode::Branch(HashMap::new()),
    }
  }
}

impl Extractor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn into_value(self) -> Value {
    to_value(&self.root, &[], &self.tracker)
  }

  fn record_path(&mut self, path: &PathExpression) {
    if path.data {
      return;
    }
    let parts = strip_sentinel(&path.parts);
    let resolved = self.tracker.resolve(parts, path.depth);
    if resolved.is_empty() {
      return;
    }
    insert(&mut self.root, &resolved);
  }

  fn param_path(&self, param: &ExprNode) -> Option<Vec<String>> {
    match param {
      ExprNode::Path(p) if !p.data => Some(self.tracker.resolve(strip_sentinel(&p.parts), p.depth)),
      _ => None,
    }
  }
}

/// Drops a leading `this`/`.`/empty sentinel segment -- `{{this.field}}` and
/// `{{./field}}` both qualify the same as a bare `{{field}}`.
fn strip_sentinel(parts: &[String]) -> &[String] {
  match parts.first().map(String::as_str) {
    Some("this") | Some(".") | Some("") => &parts[1..],
    _ => parts,
  }
}

fn insert(node: &mut StubNode, path: &[String]) {
  let leaf = format!("test_{}", path.last().expect("resolved paths are never empty"));
  insert_labeled(node, path, leaf);
}

fn insert_labeled(node: &mut StubNode, path: &[String], leaf: String) {
  match path.split_first() {
    None => {}
    Some((head, [])) => {
      node.branch_mut().entry(head.clone()).or_insert(StubNode::Leaf(leaf));
    }
    Some((head, rest)) => {
      let child = node.branch_mut().entry(head.clone()).or_insert_with(|| StubNode::Branch(HashMap::new()));
      insert_labeled(child, rest, leaf);
    }
  }
}

fn to_value(node: &StubNode, path: &[String], tracker: &ContextTracker) -> Value {
  match node {
    StubNode::Leaf(stub) => {
      let value = Value::string(stub.clone());
      if tracker.is_iteration_path(path) {
        Value::sequence(vec![value])
      } else {
        value
      }
    }
    StubNode::Branch(children) => {
      let mapping = children
        .iter()
        .map(|(key, child)| {
          let mut child_path = path.to_vec();
          child_path.push(key.clone());
          (key.clone(), to_value(child, &child_path, tracker))
        })
        .collect();
      let mapping = Value::mapping(mapping);
      if tracker.is_iteration_path(path) {
        Value::sequence(vec![mapping])
      } else {
        mapping
      }
    }
  }
}

impl Visitor for Extractor {
  type Output = ();

  fn visit_program(&mut self, node: &Program) {
    for stmt in &node.body {
      stmt.accept(self);
    }
  }

  fn visit_mustache(&mut self, node: &ast::MustacheStatement) {
    node.expression.accept(self);
  }

  fn visit_block(&mut self, node: &ast::BlockStatement) {
    let expr = &node.expression;
    let name = expr.path.parts.first().map(String::as_str).unwrap_or("");
    let has_block_params = node.program.as_ref().map(|p| !p.block_params.is_empty()).unwrap_or(false);
    let is_each = name == "each";
    let is_conditional = name == "if" || name == "unless";
    let pushes_frame = is_each || name == "with" || has_block_params;

    if pushes_frame {
      let frame_path = expr
        .params
        .first()
        .and_then(|p| self.param_path(p))
        .or_else(|| {
          node
            .program
            .as_ref()
            .and_then(|p| p.block_params.first().cloned())
            .map(|alias| vec![alias])
        })
        .unwrap_or_default();
      let alias = node.program.as_ref().and_then(|p| p.block_params.first().cloned());

      self.tracker.push(frame_path, alias, is_each);
      if let Some(program) = &node.program {
        program.accept(self);
      }
      self.tracker.pop();
    } else {
      if !is_conditional {
        for param in &expr.params {
          param.accept(self);
        }
        if let Some(hash) = &expr.hash {
          for pair in &hash.pairs {
            pair.value.accept(self);
          }
        }
      }
      if let Some(program) = &node.program {
        program.accept(self);
      }
    }

    if let Some(inverse) = &node.inverse {
      inverse.accept(self);
    }
  }

  fn visit_partial(&mut self, node: &ast::PartialStatement) {
    // Partials reference a separate template; only the arguments visible in
    // this program's own AST are recorded, not whatever the referenced
    // partial does with them.
    for param in &node.params {
      param.accept(self);
    }
    if let Some(hash) = &node.hash {
      for pair in &hash.pairs {
        pair.value.accept(self);
      }
    }
  }

  fn visit_content(&mut self, _node: &ast::ContentStatement) {}

  fn visit_comment(&mut self, _node: &ast::CommentStatement) {}

  fn visit_expression(&mut self, node: &Expression) {
    if node.helper_name(false).is_none() {
      self.record_path(&node.path);
    }
    for param in &node.params {
      param.accept(self);
    }
    if let Some(hash) = &node.hash {
      for pair in &hash.pairs {
        pair.value.accept(self);
      }
    }
  }

  fn visit_sub_expression(&mut self, node: &ast::SubExpression) {
    node.expression.accept(self);
  }

  fn visit_path(&mut self, node: &PathExpression) {
    self.record_path(node);
  }

  fn visit_string(&mut self, _node: &ast::StringLiteral) {}

  fn visit_boolean(&mut self, _node: &ast::BooleanLiteral) {}

  fn visit_number(&mut self, _node: &ast::NumberLiteral) {}

  fn visit_hash(&mut self, node: &ast::Hash) {
    for pair in &node.pairs {
      pair.accept(self);
    }
  }

  fn visit_hash_pair(&mut self, node: &ast::HashPair) {
    node.value.accept(self);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::*;

  fn path(parts: &[&str]) -> PathExpression {
    PathExpression::new(parts.join("."), 0, false, parts.iter().map(|s| s.to_string()).collect())
  }

  fn bare_expr(parts: &[&str]) -> Expression {
    Expression { path: path(parts), params: vec![], hash: None }
  }

  #[test]
  fn nested_field_access_builds_a_nested_mapping() {
    let program = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["user", "name"]),
      unescaped: false,
    })]);
    let mut extractor = Extractor::new();
    program.accept(&mut extractor);
    let value = extractor.into_value();
    let user = value.get_field("user").unwrap();
    assert_eq!(user.get_field("name").unwrap().stringify(), "test_name");
  }

  #[test]
  fn with_block_rewrites_relative_references() {
    let inner = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["baz"]),
      unescaped: false,
    })]);
    let block = BlockStatement {
      expression: Expression {
        path: path(&["with"]),
        params: vec![ExprNode::Path(path(&["foo"]))],
        hash: None,
      },
      program: Some(inner),
      inverse: None,
    };
    let program = Program::new(vec![Statement::Block(block)]);
    let mut extractor = Extractor::new();
    program.accept(&mut extractor);
    let value = extractor.into_value();
    let foo = value.get_field("foo").unwrap();
    assert_eq!(foo.get_field("baz").unwrap().stringify(), "test_baz");
  }

  #[test]
  fn each_block_wraps_target_in_a_single_element_sequence() {
    let inner = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["baz"]),
      unescaped: false,
    })]);
    let block = BlockStatement {
      expression: Expression {
        path: path(&["each"]),
        params: vec![ExprNode::Path(path(&["people"]))],
        hash: None,
      },
      program: Some(inner),
      inverse: None,
    };
    let program = Program::new(vec![Statement::Block(block)]);
    let mut extractor = Extractor::new();
    program.accept(&mut extractor);
    let value = extractor.into_value();
    let people = value.get_field("people").unwrap();
    let items = people.as_sequence().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].get_field("baz").unwrap().stringify(), "test_baz");
  }

  #[test]
  fn this_prefixed_path_inside_each_strips_the_sentinel() {
    let inner = Program::new(vec![
      Statement::Mustache(MustacheStatement { expression: bare_expr(&["this", "service"]), unescaped: false }),
      Statement::Mustache(MustacheStatement { expression: bare_expr(&["this", "date"]), unescaped: false }),
    ]);
    let block = BlockStatement {
      expression: Expression {
        path: path(&["each"]),
        params: vec![ExprNode::Path(path(&["user", "services"]))],
        hash: None,
      },
      program: Some(inner),
      inverse: None,
    };
    let program = Program::new(vec![Statement::Block(block)]);
    let mut extractor = Extractor::new();
    program.accept(&mut extractor);
    let value = extractor.into_value();
    let user = value.get_field("user").unwrap();
    let services = user.get_field("services").unwrap();
    let items = services.as_sequence().unwrap();
    assert_eq!(items[0].get_field("service").unwrap().stringify(), "test_service");
    assert_eq!(items[0].get_field("date").unwrap().stringify(), "test_date");
  }

  #[test]
  fn if_condition_argument_is_not_recorded_as_its_own_leaf() {
    let inner = Program::new(vec![Statement::Mustache(MustacheStatement {
      expression: bare_expr(&["floo", "blar", "blaz"]),
      unescaped: false,
    })]);
    let block = BlockStatement {
      expression: Expression {
        path: path(&["if"]),
        params: vec![ExprNode::Path(path(&["floo"]))],
        hash: None,
      },
      program: Some(inner),
      inverse: None,
    };
    let program = Program::new(vec![Statement::Block(block)]);
    let mut extractor = Extractor::new();
    program.accept(&mut extractor);
    let value = extractor.into_value();
    let floo = value.get_field("floo").unwrap();
    let blar = floo.get_field("blar").unwrap();
    assert_eq!(blar.get_field("blaz").unwrap().stringify(), "test_blaz");
    assert!(matches!(floo, Value::Mapping(_)));
  }
}
