use plotters::prelude::*;
use tracing::debug;

use super::canvas::{FONT_FAMILY, backend_error, render_png};
use super::{PlotMode, RenderArtifact, Style};
use crate::RenderError;
use crate::sampling::Grid;

pub type Segment = ((f64, f64), (f64, f64));

/// Line segments approximating `z = 0` over the grid (marching squares).
///
/// Cells with a non-finite corner produce no segments. Ambiguous saddle
/// cells are resolved with the mean of their four corners.
pub fn zero_contour(grid: &Grid) -> Vec<Segment> {
  let mut segments = Vec::new();
  let (nx, ny) = (grid.xs.len(), grid.ys.len());
  if nx < 2 || ny < 2 {
    return segments;
  }

  for j in 0..ny - 1 {
    for i in 0..nx - 1 {
      let v00 = grid.z(i, j);
      let v10 = grid.z(i + 1, j);
      let v01 = grid.z(i, j + 1);
      let v11 = grid.z(i + 1, j + 1);
      if !(v00.is_finite()
        && v10.is_finite()
        && v01.is_finite()
        && v11.is_finite())
      {
        continue;
      }

      let case = (v00 >= 0.0) as u8
        | ((v10 >= 0.0) as u8) << 1
        | ((v01 >= 0.0) as u8) << 2
        | ((v11 >= 0.0) as u8) << 3;
      if case == 0 || case == 15 {
        continue;
      }

      let (x0, x1) = (grid.xs[i], grid.xs[i + 1]);
      let (y0, y1) = (grid.ys[j], grid.ys[j + 1]);
      let bottom = (lerp(x0, x1, v00, v10), y0);
      let top = (lerp(x0, x1, v01, v11), y1);
      let left = (x0, lerp(y0, y1, v00, v01));
      let right = (x1, lerp(y0, y1, v10, v11));
      let center_above = (v00 + v10 + v01 + v11) / 4.0 >= 0.0;

      match case {
        1 | 14 => segments.push((bottom, left)),
        2 | 13 => segments.push((bottom, right)),
        3 | 12 => segments.push((left, right)),
        4 | 11 => segments.push((left, top)),
        5 | 10 => segments.push((bottom, top)),
        7 | 8 => segments.push((top, right)),
        6 if center_above => {
          segments.push((bottom, left));
          segments.push((top, right));
        }
        6 => {
          segments.push((bottom, right));
          segments.push((left, top));
        }
        9 if center_above => {
          segments.push((bottom, right));
          segments.push((left, top));
        }
        9 => {
          segments.push((bottom, left));
          segments.push((top, right));
        }
        _ => {}
      }
    }
  }
  segments
}

/// Position of the zero between `a` (value `va`) and `b` (value `vb`).
fn lerp(a: f64, b: f64, va: f64, vb: f64) -> f64 {
  let dv = vb - va;
  if dv.abs() < f64::EPSILON {
    (a + b) / 2.0
  } else {
    a + (b - a) * (-va / dv)
  }
}

pub(crate) fn draw(
  grid: &Grid,
  formula: &str,
  style: &Style,
) -> Result<RenderArtifact, RenderError> {
  if grid.valid_count() == 0 {
    return Err(RenderError::NoValidSamples);
  }
  let (x_min, x_max) = axis_bounds(&grid.xs)?;
  let (y_min, y_max) = axis_bounds(&grid.ys)?;
  let segments = zero_contour(grid);
  debug!(segments = segments.len(), "traced zero contour");

  let title = format!("Implicit function: {formula}");
  let png = render_png(style, |root| {
    let mut chart = ChartBuilder::on(root)
      .caption(&title, (FONT_FAMILY, 22.0).into_font())
      .margin(12)
      .x_label_area_size(40)
      .y_label_area_size(50)
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

    let line = BLUE.stroke_width(2);
    chart
      .draw_series(
        segments
          .iter()
          .map(|&(a, b)| PathElement::new(vec![a, b], line)),
      )
      .map_err(backend_error)?;
    Ok(())
  })?;

  Ok(RenderArtifact {
    mode: PlotMode::Implicit,
    png,
    width: style.width,
    height: style.height,
    title,
    axis_labels: vec!["X", "Y"],
  })
}

fn axis_bounds(values: &[f64]) -> Result<(f64, f64), RenderError> {
  match (values.first(), values.last()) {
    (Some(&lo), Some(&hi)) if hi > lo => Ok((lo, hi)),
    _ => Err(RenderError::NoValidSamples),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sampling::{Deadline, Interval, sample_2d};

  fn grid_of(f: impl Fn(f64, f64) -> f64, resolution: usize) -> Grid {
    let domain = Interval::new(-2.0, 2.0);
    sample_2d(&f, domain, domain, resolution, &Deadline::none()).unwrap()
  }

  #[test]
  fn line_contour_lies_on_line() {
    let grid = grid_of(|x, y| y - x, 21);
    let segments = zero_contour(&grid);
    assert!(!segments.is_empty());
    for ((ax, ay), (bx, by)) in segments {
      assert!((ax - ay).abs() < 1e-9);
      assert!((bx - by).abs() < 1e-9);
    }
  }

  #[test]
  fn positive_field_has_no_contour() {
    let grid = grid_of(|x, y| x * x + y * y + 1.0, 11);
    assert!(zero_contour(&grid).is_empty());
  }

  #[test]
  fn lerp_finds_zero() {
    assert_eq!(lerp(0.0, 1.0, -1.0, 1.0), 0.5);
    assert_eq!(lerp(0.0, 4.0, -1.0, 3.0), 1.0);
  }
}
