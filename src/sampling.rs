//! Numeric sampling of formulas over the fixed plotting domain.
//!
//! Points where the formula is undefined are kept as `NaN` so that a
//! curve with a few singularities still renders everywhere else.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::expression::Expression;
use crate::{DomainError, RenderError, Violation};

/// Closed interval of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
  pub min: f64,
  pub max: f64,
}

impl Interval {
  pub const fn new(min: f64, max: f64) -> Self {
    Interval { min, max }
  }

  pub fn span(&self) -> f64 {
    self.max - self.min
  }

  /// `count` evenly spaced values including both ends.
  pub fn linspace(&self, count: usize) -> Vec<f64> {
    match count {
      0 => Vec::new(),
      1 => vec![self.min],
      _ => {
        let step = self.span() / (count - 1) as f64;
        (0..count)
          .map(|i| {
            if i == count - 1 {
              self.max
            } else {
              self.min + i as f64 * step
            }
          })
          .collect()
      }
    }
  }
}

/// Plotting domain of every axis in every mode.
pub const DOMAIN: Interval = Interval::new(-10.0, 10.0);
/// Number of points of an explicit curve.
pub const LINE_SAMPLES: usize = 400;
/// Points per axis of an implicit or surface grid.
pub const GRID_RESOLUTION: usize = 400;

/// Absolute point in time after which sampling gives up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
  at: Option<(Instant, Duration)>,
}

impl Deadline {
  pub fn none() -> Self {
    Deadline::default()
  }

  pub fn after(budget: Duration) -> Self {
    Deadline {
      at: Some((Instant::now() + budget, budget)),
    }
  }

  pub fn from_timeout(timeout: Option<Duration>) -> Self {
    timeout.map(Deadline::after).unwrap_or_default()
  }

  pub fn check(&self) -> Result<(), RenderError> {
    match self.at {
      Some((at, budget)) if Instant::now() >= at => Err(RenderError::TimedOut {
        millis: budget.as_millis(),
      }),
      _ => Ok(()),
    }
  }
}

/// A scalar field `z = f(x, y)`.
pub trait Field {
  fn value_at(&self, x: f64, y: f64) -> Result<f64, DomainError>;
}

impl Field for Expression {
  fn value_at(&self, x: f64, y: f64) -> Result<f64, DomainError> {
    self.evaluate_at(&[x, y])
  }
}

/// Closed-form fields given as plain closures.
impl<F> Field for F
where
  F: Fn(f64, f64) -> f64,
{
  fn value_at(&self, x: f64, y: f64) -> Result<f64, DomainError> {
    let z = self(x, y);
    if z.is_finite() {
      Ok(z)
    } else {
      Err(DomainError {
        point: vec![("x".into(), x), ("y".into(), y)],
        violation: Violation::NonFinite,
      })
    }
  }
}

/// Sampled explicit curve. `y` is `NaN` where the formula is undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
  pub points: Vec<(f64, f64)>,
}

impl Curve {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn valid_count(&self) -> usize {
    self.points.iter().filter(|(_, y)| y.is_finite()).count()
  }

  /// Range of the finite `y` values, `None` if there are none.
  pub fn y_range(&self) -> Option<(f64, f64)> {
    finite_range(self.points.iter().map(|&(_, y)| y))
  }
}

/// Sampled field on a Cartesian grid. `z` is row-major with one row per
/// `y` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
  pub xs: Vec<f64>,
  pub ys: Vec<f64>,
  z: Vec<f64>,
}

impl Grid {
  /// Field value at column `i` (x) and row `j` (y).
  pub fn z(&self, i: usize, j: usize) -> f64 {
    self.z[j * self.xs.len() + i]
  }

  pub fn values(&self) -> &[f64] {
    &self.z
  }

  pub fn valid_count(&self) -> usize {
    self.z.iter().filter(|z| z.is_finite()).count()
  }

  pub fn z_range(&self) -> Option<(f64, f64)> {
    finite_range(self.z.iter().copied())
  }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
  values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
    None => Some((v, v)),
    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
  })
}

/// Evaluate a one-variable expression at `count` evenly spaced points.
pub fn sample_1d(
  expr: &Expression,
  domain: Interval,
  count: usize,
  deadline: &Deadline,
) -> Result<Curve, RenderError> {
  let mut points = Vec::with_capacity(count);
  for x in domain.linspace(count) {
    let y = expr.evaluate_at(&[x]).unwrap_or(f64::NAN);
    points.push((x, y));
  }
  deadline.check()?;

  let curve = Curve { points };
  debug!(
    formula = expr.source(),
    samples = curve.len(),
    valid = curve.valid_count(),
    "sampled curve"
  );
  Ok(curve)
}

/// Evaluate a field on a `resolution` x `resolution` grid spanning
/// `x_domain` x `y_domain`.
pub fn sample_2d<F: Field + ?Sized>(
  field: &F,
  x_domain: Interval,
  y_domain: Interval,
  resolution: usize,
  deadline: &Deadline,
) -> Result<Grid, RenderError> {
  let xs = x_domain.linspace(resolution);
  let ys = y_domain.linspace(resolution);
  let mut z = Vec::with_capacity(xs.len() * ys.len());
  for &y in &ys {
    deadline.check()?;
    for &x in &xs {
      z.push(field.value_at(x, y).unwrap_or(f64::NAN));
    }
  }

  let grid = Grid { xs, ys, z };
  debug!(
    points = grid.values().len(),
    valid = grid.valid_count(),
    "sampled grid"
  );
  Ok(grid)
}
