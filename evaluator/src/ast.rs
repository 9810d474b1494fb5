//! Node shapes produced by the (external) parser, plus the double-dispatch
//! visit operation every node supports. This crate never builds these nodes
//! from source text; tests construct them directly.

use std::fmt;

/// A sequence of statements, plus the block-parameter names bound when this
/// program is the consequent/inverse body of a block invocation.
#[derive(Debug, Clone, Default)]
pub struct Program {
  pub body: Vec<Statement>,
  pub block_params: Vec<String>,
}

impl Program {
  pub fn new(body: Vec<Statement>) -> Self {
    Self { body, block_params: Vec::new() }
  }

  pub fn with_block_params(mut self, params: Vec<String>) -> Self {
    self.block_params = params;
    self
  }

  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_program(self)
  }
}

#[derive(Debug, Clone)]
pub enum Statement {
  Mustache(MustacheStatement),
  Block(BlockStatement),
  Partial(PartialStatement),
  Content(ContentStatement),
  Comment(CommentStatement),
}

impl Statement {
  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    match self {
      Self::Mustache(n) => visitor.visit_mustache(n),
      Self::Block(n) => visitor.visit_block(n),
      Self::Partial(n) => visitor.visit_partial(n),
      Self::Content(n) => visitor.visit_content(n),
      Self::Comment(n) => visitor.visit_comment(n),
    }
  }
}

#[derive(Debug, Clone)]
pub struct MustacheStatement {
  pub expression: Expression,
  /// `{{{ ... }}}` or `{{& ... }}`: bypasses HTML escaping.
  pub unescaped: bool,
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
  pub expression: Expression,
  pub program: Option<Program>,
  pub inverse: Option<Program>,
}

#[derive(Debug, Clone)]
pub enum PartialName {
  Path(PathExpression),
  Sub(SubExpression),
}

#[derive(Debug, Clone)]
pub struct PartialStatement {
  pub name: PartialName,
  pub params: Vec<ExprNode>,
  pub hash: Option<Hash>,
  /// Leading whitespace captured from the partial's source line.
  pub indent: String,
}

#[derive(Debug, Clone)]
pub struct ContentStatement {
  pub value: String,
}

#[derive(Debug, Clone)]
pub struct CommentStatement {
  pub value: String,
}

/// A helper/field invocation: `path param1 param2 key=value`.
#[derive(Debug, Clone)]
pub struct Expression {
  pub path: PathExpression,
  pub params: Vec<ExprNode>,
  pub hash: Option<Hash>,
}

impl Expression {
  /// The name under which this expression would be looked up as a helper,
  /// or `None` if it can't possibly be one.
  ///
  /// A bare single identifier is only a helper *candidate* when it carries
  /// arguments, or when it is the invocation of a block -- otherwise it is
  /// resolved as a plain field lookup (see `literal_str`).
  pub fn helper_name(&self, is_block_expression: bool) -> Option<&str> {
    if self.is_bare_identifier() && (!self.params.is_empty() || self.hash.is_some() || is_block_expression) {
      Some(self.path.parts[0].as_str())
    } else {
      None
    }
  }

  /// The identifier to resolve as a single field, when this expression's
  /// path is exactly one non-data, zero-depth segment.
  pub fn literal_str(&self) -> Option<&str> {
    if self.is_bare_identifier() {
      Some(self.path.parts[0].as_str())
    } else {
      None
    }
  }

  fn is_bare_identifier(&self) -> bool {
    self.path.depth == 0 && !self.path.data && self.path.parts.len() == 1
  }

  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_expression(self)
  }
}

impl fmt::Display for Expression {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path.original)
  }
}

#[derive(Debug, Clone)]
pub struct SubExpression {
  pub expression: Box<Expression>,
}

impl SubExpression {
  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_sub_expression(self)
  }
}

/// A dotted path, e.g. `../foo.[bar baz].qux` or `@root.foo`.
#[derive(Debug, Clone)]
pub struct PathExpression {
  /// Number of leading `../`.
  pub depth: usize,
  /// Leading `@`.
  pub data: bool,
  pub original: String,
  pub parts: Vec<String>,
}

impl PathExpression {
  pub fn new(original: impl Into<String>, depth: usize, data: bool, parts: Vec<String>) -> Self {
    Self { depth, data, original: original.into(), parts }
  }

  /// `@root` followed by at least one more segment.
  pub fn is_data_root(&self) -> bool {
    self.data && self.parts.first().map(|p| p.as_str()) == Some("root")
  }

  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_path(self)
  }
}

#[derive(Debug, Clone)]
pub struct Hash {
  pub pairs: Vec<HashPair>,
}

impl Hash {
  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_hash(self)
  }
}

#[derive(Debug, Clone)]
pub struct HashPair {
  pub key: String,
  pub value: ExprNode,
}

impl HashPair {
  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    visitor.visit_hash_pair(self)
  }
}

/// Anything that can sit in a parameter slot or a hash-pair value.
#[derive(Debug, Clone)]
pub enum ExprNode {
  Path(PathExpression),
  Sub(SubExpression),
  String(StringLiteral),
  Boolean(BooleanLiteral),
  Number(NumberLiteral),
}

impl ExprNode {
  pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
    match self {
      Self::Path(n) => visitor.visit_path(n),
      Self::Sub(n) => visitor.visit_sub_expression(n),
      Self::String(n) => visitor.visit_string(n),
      Self::Boolean(n) => visitor.visit_boolean(n),
      Self::Number(n) => visitor.visit_number(n),
    }
  }
}

#[derive(Debug, Clone)]
pub struct StringLiteral {
  pub value: String,
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanLiteral {
  pub value: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NumberLiteral {
  pub value: f64,
}

/// Double-dispatch entry point implemented once per traversal (evaluation,
/// extraction, ...). `Output` differs per implementor: the evaluator
/// produces runtime values, the extractor produces nothing (it accumulates
/// into its own state).
pub trait Visitor {
  type Output;

  fn visit_program(&mut self, node: &Program) -> Self::Output;
  fn visit_mustache(&mut self, node: &MustacheStatement) -> Self::Output;
  fn visit_block(&mut self, node: &BlockStatement) -> Self::Output;
  fn visit_partial(&mut self, node: &PartialStatement) -> Self::Output;
  fn visit_content(&mut self, node: &ContentStatement) -> Self::Output;
  fn visit_comment(&mut self, node: &CommentStatement) -> Self::Output;
  fn visit_expression(&mut self, node: &Expression) -> Self::Output;
  fn visit_sub_expression(&mut self, node: &SubExpression) -> Self::Output;
  fn visit_path(&mut self, node: &PathExpression) -> Self::Output;
  fn visit_string(&mut self, node: &StringLiteral) -> Self::Output;
  fn visit_boolean(&mut self, node: &BooleanLiteral) -> Self::Output;
  fn visit_number(&mut self, node: &NumberLiteral) -> Self::Output;
  fn visit_hash(&mut self, node: &Hash) -> Self::Output;
  fn visit_hash_pair(&mut self, node: &HashPair) -> Self::Output;
}
