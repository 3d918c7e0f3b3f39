use pest::Parser;
use pest_derive::Parser;
use std::fmt;
use thiserror::Error;

pub mod chat;
pub mod config;
pub mod controller;
pub mod expression;
pub mod menu;
pub mod render;
pub mod sampling;
pub mod session;
pub mod syntax;

pub use controller::{Controller, Sink};
pub use expression::Expression;
pub use render::{Dispatcher, PlotMode, Plotter, RenderArtifact};
pub use session::{PendingMode, SessionId, SessionStore};

#[derive(Parser)]
#[grammar = "formula.pest"]
pub struct FormulaParser;

impl FormulaParser {
  pub fn parse_relation(
    input: &str,
  ) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>>
  {
    Self::parse(Rule::Relation, input).map_err(Box::new)
  }
}

pub fn parse(
  input: &str,
) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>> {
  FormulaParser::parse_relation(input)
}

/// Formula text that could not be turned into an [`Expression`].
#[derive(Error, Debug)]
pub enum ParseError {
  #[error("Empty formula")]
  EmptyInput,
  #[error("Formula is too long ({len} characters, at most {max} allowed)")]
  TooLong { len: usize, max: usize },
  #[error("Formula is nested too deeply (depth {depth}, at most {max})")]
  TooDeep { depth: usize, max: usize },
  #[error("Formula is too large ({nodes} terms, at most {max})")]
  TooManyNodes { nodes: usize, max: usize },
  #[error("Syntax error: {0}")]
  Syntax(#[from] Box<pest::error::Error<Rule>>),
  #[error("Unknown name '{name}' (allowed: {allowed})")]
  UnknownIdentifier { name: String, allowed: String },
  #[error("Function '{0}' is not allowed")]
  UnknownFunction(String),
  #[error("Invalid number '{0}'")]
  InvalidNumber(String),
  #[error("Expected '{expected} = ...' but found '{found} = ...'")]
  UnexpectedLeftSide { expected: String, found: String },
  #[error("An equation is not allowed here, enter a single expression")]
  UnexpectedEquation,
}

/// The reason a formula has no real value at a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
  DivisionByZero,
  SqrtOfNegative,
  LogOfNonPositive,
  OutsideDomain(syntax::Function),
  NonReal,
  NonFinite,
  Unbound(String),
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Violation::DivisionByZero => write!(f, "division by zero"),
      Violation::SqrtOfNegative => write!(f, "square root of a negative number"),
      Violation::LogOfNonPositive => {
        write!(f, "logarithm of a non-positive number")
      }
      Violation::OutsideDomain(func) => {
        write!(f, "argument of {} is outside its domain", func.name())
      }
      Violation::NonReal => write!(f, "result is not a real number"),
      Violation::NonFinite => write!(f, "result is not finite"),
      Violation::Unbound(name) => write!(f, "unbound variable '{name}'"),
    }
  }
}

/// A well-formed formula that is undefined at one sample point.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{violation} at {}", format_point(.point))]
pub struct DomainError {
  pub point: Vec<(String, f64)>,
  pub violation: Violation,
}

fn format_point(point: &[(String, f64)]) -> String {
  point
    .iter()
    .map(|(name, value)| format!("{name} = {value}"))
    .collect::<Vec<_>>()
    .join(", ")
}

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("The formula has no valid values in the plotted range")]
  NoValidSamples,
  #[error("The values are too large to plot")]
  RangeTooLarge,
  #[error("Plotting took longer than {millis} ms")]
  TimedOut { millis: u128 },
  #[error("Drawing failed: {0}")]
  Backend(String),
  #[error("Could not encode image: {0}")]
  Encode(String),
  #[error("Could not load the plot font")]
  Font,
}

/// Any failure of a single plot request.
#[derive(Error, Debug)]
pub enum PlotError {
  #[error("{0}")]
  Parse(#[from] ParseError),
  #[error("{0}")]
  Domain(#[from] DomainError),
  #[error("{0}")]
  Render(#[from] RenderError),
}
