//! Render dispatch: formula text in, PNG artifact out.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::expression::Expression;
use crate::sampling::{
  Curve, DOMAIN, Deadline, GRID_RESOLUTION, Grid, LINE_SAMPLES, sample_1d,
  sample_2d,
};
use crate::{ParseError, PlotError, RenderError};

pub mod canvas;
pub mod explicit;
pub mod implicit;
pub mod surface;

pub(crate) const DEFAULT_WIDTH: u32 = 640;
pub(crate) const DEFAULT_HEIGHT: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotMode {
  /// `y = f(x)` drawn as a line.
  Explicit,
  /// `g(x, y) = 0` drawn as its zero contour.
  Implicit,
  /// `z = f(x, y)` drawn as a 3D surface.
  Surface,
}

impl PlotMode {
  pub fn variables(self) -> &'static [&'static str] {
    match self {
      PlotMode::Explicit => &["x"],
      PlotMode::Implicit | PlotMode::Surface => &["x", "y"],
    }
  }

  /// Name a relation may be solved for on its left side.
  pub fn solved_for(self) -> Option<&'static str> {
    match self {
      PlotMode::Explicit => Some("y"),
      PlotMode::Implicit => None,
      PlotMode::Surface => Some("z"),
    }
  }

  pub fn parse(self, text: &str) -> Result<Expression, ParseError> {
    Expression::parse_relation(text, self.variables(), self.solved_for())
  }
}

impl fmt::Display for PlotMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlotMode::Explicit => write!(f, "explicit"),
      PlotMode::Implicit => write!(f, "implicit"),
      PlotMode::Surface => write!(f, "surface"),
    }
  }
}

/// Output image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
  pub width: u32,
  pub height: u32,
}

impl Default for Style {
  fn default() -> Self {
    Style {
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }
}

/// An encoded plot together with what was used to label it.
#[derive(Debug, Clone)]
pub struct RenderArtifact {
  pub mode: PlotMode,
  pub png: Vec<u8>,
  pub width: u32,
  pub height: u32,
  pub title: String,
  pub axis_labels: Vec<&'static str>,
}

/// Samples handed to [`render`].
#[derive(Debug, Clone)]
pub enum SampledData {
  Curve(Curve),
  Field(Grid),
}

/// Draw already sampled data in the given mode.
pub fn render(
  mode: PlotMode,
  data: &SampledData,
  formula: &str,
  style: &Style,
) -> Result<RenderArtifact, RenderError> {
  match (mode, data) {
    (PlotMode::Explicit, SampledData::Curve(curve)) => {
      explicit::draw(curve, formula, style)
    }
    (PlotMode::Implicit, SampledData::Field(grid)) => {
      implicit::draw(grid, formula, style)
    }
    (PlotMode::Surface, SampledData::Field(grid)) => {
      surface::draw(grid, formula, style)
    }
    (mode, _) => Err(RenderError::Backend(format!(
      "{mode} plots cannot be drawn from this kind of samples"
    ))),
  }
}

/// Anything that turns formula text into a plot.
pub trait Plotter {
  fn plot(&self, mode: PlotMode, text: &str)
  -> Result<RenderArtifact, PlotError>;
}

/// Parses, samples and renders with the fixed domain and resolution of
/// each mode.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
  style: Style,
  timeout: Option<Duration>,
}

impl Dispatcher {
  pub fn new(style: Style, timeout: Option<Duration>) -> Self {
    Dispatcher { style, timeout }
  }

  pub fn style(&self) -> &Style {
    &self.style
  }

  /// Parse and sample without drawing.
  pub fn sample(
    &self,
    mode: PlotMode,
    text: &str,
  ) -> Result<(Expression, SampledData), PlotError> {
    let expr = mode.parse(text)?;
    let deadline = Deadline::from_timeout(self.timeout);
    let data = match mode {
      PlotMode::Explicit => {
        SampledData::Curve(sample_1d(&expr, DOMAIN, LINE_SAMPLES, &deadline)?)
      }
      PlotMode::Implicit | PlotMode::Surface => SampledData::Field(sample_2d(
        &expr,
        DOMAIN,
        DOMAIN,
        GRID_RESOLUTION,
        &deadline,
      )?),
    };
    Ok((expr, data))
  }
}

impl Plotter for Dispatcher {
  fn plot(
    &self,
    mode: PlotMode,
    text: &str,
  ) -> Result<RenderArtifact, PlotError> {
    let started = Instant::now();
    let (expr, data) = self.sample(mode, text)?;
    let artifact = render(mode, &data, expr.source(), &self.style)?;
    info!(
      %mode,
      formula = expr.source(),
      bytes = artifact.png.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "rendered plot"
    );
    Ok(artifact)
  }
}
