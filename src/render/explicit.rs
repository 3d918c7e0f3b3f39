use plotters::prelude::*;

use super::canvas::{
  FONT_FAMILY, backend_error, padded_range, render_png, value_range,
};
use super::{PlotMode, RenderArtifact, Style};
use crate::RenderError;
use crate::sampling::Curve;

const TITLE: &str = "Explicit function";
const LINE_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

/// Split points into contiguous finite runs, breaking at NaN.
pub(crate) fn split_into_segments(
  points: &[(f64, f64)],
) -> Vec<Vec<(f64, f64)>> {
  let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
  let mut current: Vec<(f64, f64)> = Vec::new();

  for &(x, y) in points {
    if y.is_finite() {
      current.push((x, y));
    } else if !current.is_empty() {
      segments.push(std::mem::take(&mut current));
    }
  }
  if !current.is_empty() {
    segments.push(current);
  }
  segments
}

/// Legend text `y = <right side>`, whether or not the user typed `y =`.
fn legend_label(formula: &str) -> String {
  let rhs = match formula.split_once('=') {
    Some((_, rhs)) => rhs.trim(),
    None => formula.trim(),
  };
  format!("y = {rhs}")
}

pub(crate) fn draw(
  curve: &Curve,
  formula: &str,
  style: &Style,
) -> Result<RenderArtifact, RenderError> {
  let (y_min, y_max) =
    padded_range(curve.y_range().ok_or(RenderError::NoValidSamples)?)?;
  let (x_min, x_max) = match (curve.points.first(), curve.points.last()) {
    (Some(&(first, _)), Some(&(last, _))) => {
      value_range((first.min(last), first.max(last)))?
    }
    _ => return Err(RenderError::NoValidSamples),
  };
  let legend = legend_label(formula);
  let segments = split_into_segments(&curve.points);

  let png = render_png(style, |root| {
    let mut chart = ChartBuilder::on(root)
      .caption(TITLE, (FONT_FAMILY, 22.0).into_font())
      .margin(12)
      .x_label_area_size(40)
      .y_label_area_size(56)
      .build_cartesian_2d(x_min..x_max, y_min..y_max)
      .map_err(backend_error)?;

    chart
      .configure_mesh()
      .x_desc("X")
      .y_desc("Y")
      .label_style((FONT_FAMILY, 13.0).into_font())
      .axis_desc_style((FONT_FAMILY, 15.0).into_font())
      .light_line_style(RGBColor(0xee, 0xee, 0xee).stroke_width(1))
      .draw()
      .map_err(backend_error)?;

    let line = LINE_COLOR.stroke_width(2);
    for (idx, segment) in segments.into_iter().enumerate() {
      let series = chart
        .draw_series(LineSeries::new(segment, line))
        .map_err(backend_error)?;
      if idx == 0 {
        series.label(legend.as_str()).legend(move |(x, y)| {
          PathElement::new(vec![(x, y), (x + 20, y)], line)
        });
      }
    }

    chart
      .configure_series_labels()
      .position(SeriesLabelPosition::UpperRight)
      .label_font((FONT_FAMILY, 14.0).into_font())
      .background_style(&WHITE.mix(0.85))
      .border_style(&BLACK)
      .draw()
      .map_err(backend_error)?;
    Ok(())
  })?;

  Ok(RenderArtifact {
    mode: PlotMode::Explicit,
    png,
    width: style.width,
    height: style.height,
    title: TITLE.to_string(),
    axis_labels: vec!["X", "Y"],
  })
}
