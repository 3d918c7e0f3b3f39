//! Parsed user formulas.
//!
//! An [`Expression`] can only be obtained through [`Expression::parse`] or
//! [`Expression::parse_relation`], so every value of this type has passed
//! the grammar, the name allow-list and the size limits.

use crate::syntax::{BinaryOperator, Builder, Expr, rename_rule};
use crate::{DomainError, FormulaParser, ParseError, Rule, Violation};

/// Longest formula text accepted, in characters.
pub const MAX_FORMULA_LEN: usize = 256;
/// Deepest AST accepted.
pub const MAX_DEPTH: usize = 48;
/// Largest AST accepted, in nodes.
pub const MAX_NODES: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
  source: String,
  variables: Vec<String>,
  root: Expr,
}

impl Expression {
  /// Parse a single expression over `variables`. An `=` sign is rejected.
  pub fn parse(text: &str, variables: &[&str]) -> Result<Self, ParseError> {
    let (lhs, rhs) = parse_sides(text, variables)?;
    if rhs.is_some() {
      return Err(ParseError::UnexpectedEquation);
    }
    Expression::from_root(text, variables, lhs)
  }

  /// Parse either an expression or a relation `lhs = rhs`.
  ///
  /// With `solved_for = Some(name)` the left side of a relation must be
  /// exactly `name` and the right side becomes the expression
  /// (`y = x**2` means `x**2`). Without it the relation is rewritten as
  /// `lhs - rhs`, whose zero set is the relation.
  pub fn parse_relation(
    text: &str,
    variables: &[&str],
    solved_for: Option<&str>,
  ) -> Result<Self, ParseError> {
    let Some(target) = solved_for else {
      let (lhs, rhs) = parse_sides(text, variables)?;
      let root = match rhs {
        Some(rhs) => Expr::BinaryOp {
          op: BinaryOperator::Minus,
          left: Box::new(lhs),
          right: Box::new(rhs),
        },
        None => lhs,
      };
      return Expression::from_root(text, variables, root);
    };

    // The solved-for name is not a variable of the expression, so it is
    // checked textually before building the right side.
    let (lhs_text, rhs_text) = match text.split_once('=') {
      Some((lhs, rhs)) => (Some(lhs.trim()), rhs),
      None => (None, text),
    };
    if let Some(lhs) = lhs_text {
      if lhs != target {
        return Err(ParseError::UnexpectedLeftSide {
          expected: target.to_string(),
          found: lhs.to_string(),
        });
      }
    }
    let mut expression = Expression::parse(rhs_text, variables)?;
    expression.source = text.trim().to_string();
    Ok(expression)
  }

  fn from_root(
    text: &str,
    variables: &[&str],
    root: Expr,
  ) -> Result<Self, ParseError> {
    let depth = root.depth();
    if depth > MAX_DEPTH {
      return Err(ParseError::TooDeep {
        depth,
        max: MAX_DEPTH,
      });
    }
    let nodes = root.node_count();
    if nodes > MAX_NODES {
      return Err(ParseError::TooManyNodes {
        nodes,
        max: MAX_NODES,
      });
    }
    Ok(Expression {
      source: text.trim().to_string(),
      variables: variables.iter().map(|v| v.to_string()).collect(),
      root,
    })
  }

  /// The formula text as the user typed it (trimmed).
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn variables(&self) -> &[String] {
    &self.variables
  }

  pub fn root(&self) -> &Expr {
    &self.root
  }

  /// Evaluate with named bindings. Every variable of the expression must
  /// be bound; extra bindings are ignored.
  pub fn evaluate(&self, bindings: &[(&str, f64)]) -> Result<f64, DomainError> {
    let mut point = Vec::with_capacity(self.variables.len());
    for name in &self.variables {
      match bindings.iter().find(|(n, _)| *n == name.as_str()) {
        Some((_, value)) => point.push(*value),
        None => {
          return Err(DomainError {
            point: bindings.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            violation: Violation::Unbound(name.clone()),
          });
        }
      }
    }
    self.evaluate_at(&point)
  }

  /// Evaluate at a point given in variable order.
  pub fn evaluate_at(&self, point: &[f64]) -> Result<f64, DomainError> {
    if point.len() < self.variables.len() {
      let missing = self.variables[point.len()].clone();
      return Err(self.domain_error(point, Violation::Unbound(missing)));
    }
    self
      .root
      .eval(point)
      .map_err(|violation| self.domain_error(point, violation))
  }

  fn domain_error(&self, point: &[f64], violation: Violation) -> DomainError {
    DomainError {
      point: self
        .variables
        .iter()
        .cloned()
        .zip(point.iter().copied())
        .collect(),
      violation,
    }
  }
}

fn parse_sides(
  text: &str,
  variables: &[&str],
) -> Result<(Expr, Option<Expr>), ParseError> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Err(ParseError::EmptyInput);
  }
  let len = trimmed.chars().count();
  if len > MAX_FORMULA_LEN {
    return Err(ParseError::TooLong {
      len,
      max: MAX_FORMULA_LEN,
    });
  }

  let relation = FormulaParser::parse_relation(trimmed)
    .map_err(|e| Box::new((*e).renamed_rules(rename_rule)))?
    .next()
    .ok_or(ParseError::EmptyInput)?;

  let names: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
  let builder = Builder::new(&names);
  let mut sides = relation
    .into_inner()
    .filter(|pair| pair.as_rule() == Rule::Sum);
  let lhs = match sides.next() {
    Some(pair) => builder.build(pair)?,
    None => return Err(ParseError::EmptyInput),
  };
  let rhs = sides.next().map(|pair| builder.build(pair)).transpose()?;
  Ok((lhs, rhs))
}
