use pest::iterators::Pair;

use crate::{ParseError, Rule, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
  Plus,
  Minus,
  Times,
  Divide,
  Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
  Minus,
}

/// The closed set of functions a formula may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
  Sin,
  Cos,
  Tan,
  Asin,
  Acos,
  Atan,
  Sinh,
  Cosh,
  Tanh,
  Exp,
  Log,
  Log10,
  Sqrt,
  Abs,
}

/// Name table for [`Function`]. `ln` is an alias of `log`.
const FUNCTION_NAMES: [(&str, Function); 15] = [
  ("sin", Function::Sin),
  ("cos", Function::Cos),
  ("tan", Function::Tan),
  ("asin", Function::Asin),
  ("acos", Function::Acos),
  ("atan", Function::Atan),
  ("sinh", Function::Sinh),
  ("cosh", Function::Cosh),
  ("tanh", Function::Tanh),
  ("exp", Function::Exp),
  ("log", Function::Log),
  ("ln", Function::Log),
  ("log10", Function::Log10),
  ("sqrt", Function::Sqrt),
  ("abs", Function::Abs),
];

const CONSTANTS: [(&str, f64); 2] =
  [("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

impl Function {
  pub fn from_name(name: &str) -> Option<Self> {
    FUNCTION_NAMES
      .iter()
      .find(|(n, _)| *n == name)
      .map(|(_, func)| *func)
  }

  pub fn name(self) -> &'static str {
    FUNCTION_NAMES
      .iter()
      .find(|(_, func)| *func == self)
      .map(|(n, _)| *n)
      .unwrap_or("?")
  }

  /// Apply the function to a real argument, refusing arguments outside
  /// the real domain instead of producing NaN.
  pub fn apply(self, v: f64) -> Result<f64, Violation> {
    match self {
      Function::Sin => Ok(v.sin()),
      Function::Cos => Ok(v.cos()),
      Function::Tan => Ok(v.tan()),
      Function::Asin | Function::Acos if !(-1.0..=1.0).contains(&v) => {
        Err(Violation::OutsideDomain(self))
      }
      Function::Asin => Ok(v.asin()),
      Function::Acos => Ok(v.acos()),
      Function::Atan => Ok(v.atan()),
      Function::Sinh => Ok(v.sinh()),
      Function::Cosh => Ok(v.cosh()),
      Function::Tanh => Ok(v.tanh()),
      Function::Exp => Ok(v.exp()),
      Function::Log | Function::Log10 if v <= 0.0 => {
        Err(Violation::LogOfNonPositive)
      }
      Function::Log => Ok(v.ln()),
      Function::Log10 => Ok(v.log10()),
      Function::Sqrt if v < 0.0 => Err(Violation::SqrtOfNegative),
      Function::Sqrt => Ok(v.sqrt()),
      Function::Abs => Ok(v.abs()),
    }
  }
}

/// Formula AST. Variables are resolved to their position in the
/// expression's variable list while parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Number(f64),
  Variable(usize),
  UnaryOp {
    op: UnaryOperator,
    operand: Box<Expr>,
  },
  BinaryOp {
    op: BinaryOperator,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  Call {
    func: Function,
    arg: Box<Expr>,
  },
}

impl Expr {
  pub fn depth(&self) -> usize {
    match self {
      Expr::Number(_) | Expr::Variable(_) => 1,
      Expr::UnaryOp { operand, .. } => 1 + operand.depth(),
      Expr::BinaryOp { left, right, .. } => 1 + left.depth().max(right.depth()),
      Expr::Call { arg, .. } => 1 + arg.depth(),
    }
  }

  pub fn node_count(&self) -> usize {
    match self {
      Expr::Number(_) | Expr::Variable(_) => 1,
      Expr::UnaryOp { operand, .. } => 1 + operand.node_count(),
      Expr::BinaryOp { left, right, .. } => {
        1 + left.node_count() + right.node_count()
      }
      Expr::Call { arg, .. } => 1 + arg.node_count(),
    }
  }

  /// Reduce the tree to a real number. `point` holds one value per
  /// variable index.
  pub fn eval(&self, point: &[f64]) -> Result<f64, Violation> {
    let value = match self {
      Expr::Number(n) => *n,
      Expr::Variable(idx) => point[*idx],
      Expr::UnaryOp {
        op: UnaryOperator::Minus,
        operand,
      } => -operand.eval(point)?,
      Expr::BinaryOp { op, left, right } => {
        let l = left.eval(point)?;
        let r = right.eval(point)?;
        match op {
          BinaryOperator::Plus => l + r,
          BinaryOperator::Minus => l - r,
          BinaryOperator::Times => l * r,
          BinaryOperator::Divide => {
            if r == 0.0 {
              return Err(Violation::DivisionByZero);
            }
            l / r
          }
          BinaryOperator::Power => power(l, r)?,
        }
      }
      Expr::Call { func, arg } => func.apply(arg.eval(point)?)?,
    };
    if value.is_finite() {
      Ok(value)
    } else {
      Err(Violation::NonFinite)
    }
  }
}

fn power(base: f64, exponent: f64) -> Result<f64, Violation> {
  if base == 0.0 && exponent < 0.0 {
    return Err(Violation::DivisionByZero);
  }
  let value = base.powf(exponent);
  if value.is_nan() {
    // negative base with a fractional exponent
    return Err(Violation::NonReal);
  }
  Ok(value)
}

/// Turns pest pairs into [`Expr`], rejecting every name that is neither a
/// declared variable, a known constant nor an allow-listed function.
pub(crate) struct Builder<'v> {
  variables: &'v [String],
}

impl<'v> Builder<'v> {
  pub(crate) fn new(variables: &'v [String]) -> Self {
    Builder { variables }
  }

  pub(crate) fn build(&self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
      Rule::Sum => self.fold_binary(pair, |op| match op {
        "+" => BinaryOperator::Plus,
        _ => BinaryOperator::Minus,
      }),
      Rule::Product => self.fold_binary(pair, |op| match op {
        "*" => BinaryOperator::Times,
        _ => BinaryOperator::Divide,
      }),
      Rule::Unary => {
        let mut negate = false;
        let mut operand = None;
        for inner in pair.into_inner() {
          match inner.as_rule() {
            Rule::Sign => negate ^= inner.as_str() == "-",
            _ => operand = Some(self.build(inner)?),
          }
        }
        let operand = operand.ok_or(ParseError::EmptyInput)?;
        Ok(if negate {
          Expr::UnaryOp {
            op: UnaryOperator::Minus,
            operand: Box::new(operand),
          }
        } else {
          operand
        })
      }
      Rule::Power => {
        let mut inner = pair.into_inner();
        let base = match inner.next() {
          Some(p) => self.build(p)?,
          None => return Err(ParseError::EmptyInput),
        };
        // PowOp is followed by the exponent
        match (inner.next(), inner.next()) {
          (Some(_), Some(exponent)) => Ok(Expr::BinaryOp {
            op: BinaryOperator::Power,
            left: Box::new(base),
            right: Box::new(self.build(exponent)?),
          }),
          _ => Ok(base),
        }
      }
      Rule::Call => {
        let mut inner = pair.into_inner();
        let (name, arg) = match (inner.next(), inner.next()) {
          (Some(name), Some(arg)) => (name, arg),
          _ => return Err(ParseError::EmptyInput),
        };
        let func = Function::from_name(name.as_str())
          .ok_or_else(|| ParseError::UnknownFunction(name.as_str().into()))?;
        Ok(Expr::Call {
          func,
          arg: Box::new(self.build(arg)?),
        })
      }
      Rule::Identifier => self.resolve(pair.as_str()),
      Rule::Number => pair
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Expr::Number)
        .ok_or_else(|| ParseError::InvalidNumber(pair.as_str().into())),
      other => Err(ParseError::Syntax(Box::new(
        pest::error::Error::new_from_span(
          pest::error::ErrorVariant::CustomError {
            message: format!("unexpected {other:?}"),
          },
          pair.as_span(),
        ),
      ))),
    }
  }

  fn fold_binary(
    &self,
    pair: Pair<Rule>,
    operator: impl Fn(&str) -> BinaryOperator,
  ) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut result = match inner.next() {
      Some(first) => self.build(first)?,
      None => return Err(ParseError::EmptyInput),
    };
    while let (Some(op), Some(operand)) = (inner.next(), inner.next()) {
      result = Expr::BinaryOp {
        op: operator(op.as_str()),
        left: Box::new(result),
        right: Box::new(self.build(operand)?),
      };
    }
    Ok(result)
  }

  fn resolve(&self, name: &str) -> Result<Expr, ParseError> {
    if let Some(idx) = self.variables.iter().position(|v| v == name) {
      return Ok(Expr::Variable(idx));
    }
    if let Some((_, value)) = CONSTANTS.iter().find(|(n, _)| *n == name) {
      return Ok(Expr::Number(*value));
    }
    if Function::from_name(name).is_some() {
      return Err(ParseError::UnknownIdentifier {
        name: format!("{name} without parentheses"),
        allowed: self.allowed_names(),
      });
    }
    Err(ParseError::UnknownIdentifier {
      name: name.to_string(),
      allowed: self.allowed_names(),
    })
  }

  fn allowed_names(&self) -> String {
    self
      .variables
      .iter()
      .map(String::as_str)
      .chain(CONSTANTS.iter().map(|(n, _)| *n))
      .collect::<Vec<_>>()
      .join(", ")
  }
}

/// Friendlier rule names for syntax error messages.
pub(crate) fn rename_rule(rule: &Rule) -> String {
  match rule {
    Rule::EOI => "end of formula",
    Rule::Relation | Rule::Sum | Rule::Product | Rule::Unary => "expression",
    Rule::Power | Rule::Atom | Rule::Call => "term",
    Rule::AddOp => "'+' or '-'",
    Rule::MulOp => "'*' or '/'",
    Rule::PowOp => "'**' or '^'",
    Rule::Sign => "sign",
    Rule::Number => "number",
    Rule::Identifier => "name",
    _ => "input",
  }
  .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn function_names_round_trip() {
    for (name, func) in FUNCTION_NAMES {
      assert_eq!(Function::from_name(name), Some(func));
    }
    assert_eq!(Function::Log.name(), "log");
    assert_eq!(Function::from_name("ln"), Some(Function::Log));
  }

  #[test]
  fn unknown_function_names_are_rejected() {
    for name in ["eval", "exec", "open", "__import__", "Sin", "SQRT"] {
      assert_eq!(Function::from_name(name), None, "{name}");
    }
  }

  #[test]
  fn sqrt_refuses_negative_arguments() {
    assert_eq!(Function::Sqrt.apply(-1.0), Err(Violation::SqrtOfNegative));
    assert_eq!(Function::Sqrt.apply(4.0), Ok(2.0));
  }

  #[test]
  fn asin_domain_is_closed_interval() {
    assert!(Function::Asin.apply(1.0).is_ok());
    assert_eq!(
      Function::Asin.apply(1.5),
      Err(Violation::OutsideDomain(Function::Asin))
    );
  }

  #[test]
  fn negative_base_fractional_power_is_not_real() {
    assert_eq!(power(-8.0, 1.0 / 3.0), Err(Violation::NonReal));
    assert_eq!(power(-2.0, 2.0), Ok(4.0));
  }

  #[test]
  fn depth_and_node_count() {
    let expr = Expr::BinaryOp {
      op: BinaryOperator::Plus,
      left: Box::new(Expr::Variable(0)),
      right: Box::new(Expr::Call {
        func: Function::Sin,
        arg: Box::new(Expr::Number(1.0)),
      }),
    };
    assert_eq!(expr.depth(), 3);
    assert_eq!(expr.node_count(), 4);
  }
}
