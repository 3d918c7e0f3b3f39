//! 3D surface plots: an orthographic view of a coarse triangle mesh drawn
//! back to front and colored by height.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::canvas::{
  Canvas, FONT_FAMILY, backend_error, render_png, value_range,
};
use super::{PlotMode, RenderArtifact, Style};
use crate::RenderError;
use crate::sampling::Grid;

/// Cells per side of the drawn mesh.
const MESH: usize = 50;
/// Half height of the normalized box, relative to its half width of 1.
const Z_SCALE: f64 = 0.75;
const AXIS_COLOR: RGBColor = RGBColor(0x66, 0x66, 0x66);
const MAX_TICKS: usize = 20;

/// Viridis sampled at nine evenly spaced stops.
const VIRIDIS: [(u8, u8, u8); 9] = [
  (68, 1, 84),
  (71, 44, 122),
  (59, 81, 139),
  (44, 113, 142),
  (33, 144, 141),
  (39, 173, 129),
  (92, 200, 99),
  (170, 220, 50),
  (253, 231, 37),
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point3D {
  x: f64,
  y: f64,
  z: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Camera {
  azimuth: f64,
  elevation: f64,
}

impl Default for Camera {
  fn default() -> Self {
    Camera {
      azimuth: (-60.0_f64).to_radians(),
      elevation: 30.0_f64.to_radians(),
    }
  }
}

impl Camera {
  /// Orthographic projection onto the screen plane, `y` pointing up.
  fn project(&self, p: Point3D) -> (f64, f64) {
    let (sa, ca) = self.azimuth.sin_cos();
    let (se, ce) = self.elevation.sin_cos();
    let screen_x = -p.x * sa + p.y * ca;
    let screen_y = -p.x * ca * se - p.y * sa * se + p.z * ce;
    (screen_x, screen_y)
  }

  /// Distance along the viewing direction; larger is further away.
  fn depth(&self, p: Point3D) -> f64 {
    let (sa, ca) = self.azimuth.sin_cos();
    let (se, ce) = self.elevation.sin_cos();
    -(p.x * ce * ca + p.y * ce * sa + p.z * se)
  }
}

#[derive(Debug, Clone)]
struct Triangle {
  projected: [(f64, f64); 3],
  depth: f64,
  color: RGBColor,
}

pub(crate) fn viridis(t: f64) -> RGBColor {
  let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
  let scaled = t * (VIRIDIS.len() - 1) as f64;
  let idx = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
  let s = scaled - idx as f64;
  let (r0, g0, b0) = VIRIDIS[idx];
  let (r1, g1, b1) = VIRIDIS[idx + 1];
  let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * s).round() as u8;
  RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Up to `MESH + 1` evenly spread indices into `lo..=hi`, always including
/// both ends.
fn mesh_indices(lo: usize, hi: usize) -> Vec<usize> {
  let mut indices: Vec<usize> =
    (0..=MESH).map(|k| lo + k * (hi - lo) / MESH).collect();
  indices.dedup();
  indices
}

/// Column and row index bounds of the finite samples.
fn finite_bounds(grid: &Grid) -> Option<((usize, usize), (usize, usize))> {
  let mut bounds: Option<((usize, usize), (usize, usize))> = None;
  for j in 0..grid.ys.len() {
    for i in 0..grid.xs.len() {
      if !grid.z(i, j).is_finite() {
        continue;
      }
      bounds = Some(match bounds {
        None => ((i, i), (j, j)),
        Some(((i0, i1), (j0, j1))) => {
          ((i0.min(i), i1.max(i)), (j0.min(j), j1.max(j)))
        }
      });
    }
  }
  bounds
}

fn normalize(v: f64, (lo, hi): (f64, f64)) -> f64 {
  if hi > lo {
    (v - lo) / (hi - lo) * 2.0 - 1.0
  } else {
    0.0
  }
}

/// Mesh triangles sorted back to front.
///
/// The mesh spans the bounding box of the finite samples. Cells with a
/// non-finite corner are left out; if that leaves nothing, every grid cell
/// inside the box is used instead.
fn build_triangles(
  grid: &Grid,
  camera: &Camera,
  x_range: (f64, f64),
  y_range: (f64, f64),
  z_range: (f64, f64),
) -> Vec<Triangle> {
  let Some(((i0, i1), (j0, j1))) = finite_bounds(grid) else {
    return Vec::new();
  };
  let ranges = (x_range, y_range, z_range);
  let mut triangles = mesh_triangles(
    grid,
    camera,
    &mesh_indices(i0, i1),
    &mesh_indices(j0, j1),
    ranges,
  );
  if triangles.is_empty() {
    let xi: Vec<usize> = (i0..=i1).collect();
    let yi: Vec<usize> = (j0..=j1).collect();
    triangles = mesh_triangles(grid, camera, &xi, &yi, ranges);
  }

  triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
  triangles
}

fn mesh_triangles(
  grid: &Grid,
  camera: &Camera,
  xi: &[usize],
  yi: &[usize],
  (x_range, y_range, z_range): ((f64, f64), (f64, f64), (f64, f64)),
) -> Vec<Triangle> {
  let mut triangles = Vec::new();
  for rows in yi.windows(2) {
    for cols in xi.windows(2) {
      let corners = [
        (cols[0], rows[0]),
        (cols[1], rows[0]),
        (cols[1], rows[1]),
        (cols[0], rows[1]),
      ];
      let zs = corners.map(|(i, j)| grid.z(i, j));
      if zs.iter().any(|z| !z.is_finite()) {
        continue;
      }
      let points = [0, 1, 2, 3].map(|k| {
        let (i, j) = corners[k];
        Point3D {
          x: normalize(grid.xs[i], x_range),
          y: normalize(grid.ys[j], y_range),
          z: normalize(zs[k], z_range) * Z_SCALE,
        }
      });

      for tri in [[0, 1, 2], [0, 2, 3]] {
        let mean_z = tri.iter().map(|&k| zs[k]).sum::<f64>() / 3.0;
        let t = (normalize(mean_z, z_range) + 1.0) / 2.0;
        triangles.push(Triangle {
          projected: tri.map(|k| camera.project(points[k])),
          depth: tri.iter().map(|&k| camera.depth(points[k])).sum::<f64>()
            / 3.0,
          color: viridis(t),
        });
      }
    }
  }
  triangles
}

fn bounding_box_corners() -> [Point3D; 8] {
  let mut corners = [Point3D {
    x: 0.0,
    y: 0.0,
    z: 0.0,
  }; 8];
  for (idx, corner) in corners.iter_mut().enumerate() {
    corner.x = if idx & 1 == 0 { -1.0 } else { 1.0 };
    corner.y = if idx & 2 == 0 { -1.0 } else { 1.0 };
    corner.z = if idx & 4 == 0 { -Z_SCALE } else { Z_SCALE };
  }
  corners
}

/// Compute a "nice" tick step for roughly `target_labels` labels.
pub(crate) fn nice_step(range: f64, target_labels: usize) -> f64 {
  let raw = range / target_labels as f64;
  let mag = 10_f64.powf(raw.abs().log10().floor());
  let norm = raw / mag;
  let nice = if norm <= 1.0 {
    1.0
  } else if norm <= 2.0 {
    2.0
  } else if norm <= 5.0 {
    5.0
  } else {
    10.0
  };
  nice * mag
}

/// Tick values inside `lo..=hi`, at most `MAX_TICKS` of them.
fn axis_ticks((lo, hi): (f64, f64), target_labels: usize) -> Vec<f64> {
  let step = nice_step(hi - lo, target_labels);
  if !(step.is_finite() && step > 0.0) {
    return Vec::new();
  }
  let first = (lo / step).ceil() * step;
  let count = ((hi + step * 0.01 - first) / step).floor();
  if !(count.is_finite() && count >= 0.0) {
    return Vec::new();
  }
  let count = (count as usize).min(MAX_TICKS - 1);
  let mut ticks: Vec<f64> =
    (0..=count).map(|k| first + k as f64 * step).collect();
  ticks.dedup();
  ticks
}

/// Format a tick value, dropping the trailing ".0" for integers. Very large
/// or very small values use exponent notation.
pub(crate) fn format_tick(v: f64) -> String {
  let magnitude = v.abs();
  if magnitude >= 1e9 || (magnitude > 0.0 && magnitude < 1e-3) {
    format!("{v:e}")
  } else if (v - v.round()).abs() < 1e-9 {
    format!("{}", v.round() as i64)
  } else {
    format!("{v:.1}")
  }
}

pub(crate) fn draw(
  grid: &Grid,
  formula: &str,
  style: &Style,
) -> Result<RenderArtifact, RenderError> {
  let z_range =
    value_range(grid.z_range().ok_or(RenderError::NoValidSamples)?)?;
  let x_range = axis_range(&grid.xs)?;
  let y_range = axis_range(&grid.ys)?;

  let camera = Camera::default();
  let triangles = build_triangles(grid, &camera, x_range, y_range, z_range);
  tracing::debug!(triangles = triangles.len(), "built surface mesh");

  let title = format!("3D plot: {formula}");
  let png = render_png(style, |root| {
    let area = root
      .titled(&title, (FONT_FAMILY, 22.0).into_font())
      .map_err(backend_error)?;
    let (width, height) = area.dim_in_pixel();

    let mut px = (f64::INFINITY, f64::NEG_INFINITY);
    let mut py = (f64::INFINITY, f64::NEG_INFINITY);
    let box_points = bounding_box_corners().map(|c| camera.project(c));
    for &(x, y) in triangles
      .iter()
      .flat_map(|t| t.projected.iter())
      .chain(box_points.iter())
    {
      px = (px.0.min(x), px.1.max(x));
      py = (py.0.min(y), py.1.max(y));
    }

    let margin = 50.0;
    let draw_w = (width as f64 - 2.0 * margin).max(1.0);
    let draw_h = (height as f64 - 2.0 * margin).max(1.0);
    let scale = (draw_w / (px.1 - px.0)).min(draw_h / (py.1 - py.0));
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let (pcx, pcy) = ((px.0 + px.1) / 2.0, (py.0 + py.1) / 2.0);
    let to_px = |x: f64, y: f64| -> (i32, i32) {
      (
        (cx + (x - pcx) * scale).round() as i32,
        (cy - (y - pcy) * scale).round() as i32,
      )
    };

    for tri in &triangles {
      let points: Vec<(i32, i32)> =
        tri.projected.iter().map(|&(x, y)| to_px(x, y)).collect();
      area
        .draw(&Polygon::new(points.clone(), tri.color.filled()))
        .map_err(backend_error)?;
      let mut outline = points;
      outline.push(outline[0]);
      area
        .draw(&PathElement::new(outline, tri.color.stroke_width(1)))
        .map_err(backend_error)?;
    }

    draw_axes(
      &area,
      &camera,
      &to_px,
      [x_range, y_range, z_range],
      (cx, cy),
    )
  })?;

  Ok(RenderArtifact {
    mode: PlotMode::Surface,
    png,
    width: style.width,
    height: style.height,
    title,
    axis_labels: vec!["X", "Y", "Z"],
  })
}

fn axis_range(values: &[f64]) -> Result<(f64, f64), RenderError> {
  match (values.first(), values.last()) {
    (Some(&lo), Some(&hi)) if hi > lo => Ok((lo, hi)),
    _ => Err(RenderError::NoValidSamples),
  }
}

/// Three box edges meeting at the bottom corner nearest the viewer, with
/// ticks, labels and axis names.
fn draw_axes(
  area: &Canvas<'_>,
  camera: &Camera,
  to_px: &dyn Fn(f64, f64) -> (i32, i32),
  ranges: [(f64, f64); 3],
  center: (f64, f64),
) -> Result<(), RenderError> {
  let corners = bounding_box_corners();
  let origin = corners
    .iter()
    .filter(|c| c.z < 0.0)
    .min_by(|a, b| camera.depth(**a).total_cmp(&camera.depth(**b)))
    .copied()
    .unwrap_or(corners[0]);

  let ends = [
    Point3D {
      x: -origin.x,
      ..origin
    },
    Point3D {
      y: -origin.y,
      ..origin
    },
    Point3D {
      z: Z_SCALE,
      ..origin
    },
  ];
  let flipped = [origin.x > 0.0, origin.y > 0.0, false];
  let names = ["X", "Y", "Z"];

  let screen = |p: Point3D| {
    let (x, y) = camera.project(p);
    to_px(x, y)
  };
  let label_style = (FONT_FAMILY, 12.0)
    .into_font()
    .color(&AXIS_COLOR)
    .pos(Pos::new(HPos::Center, VPos::Center));
  let name_style = (FONT_FAMILY, 15.0)
    .into_font()
    .color(&BLACK)
    .pos(Pos::new(HPos::Center, VPos::Center));

  for axis in 0..3 {
    let end = ends[axis];
    let (val_min, val_max) = ranges[axis];
    let (sx0, sy0) = screen(origin);
    let (sx1, sy1) = screen(end);
    area
      .draw(&PathElement::new(
        vec![(sx0, sy0), (sx1, sy1)],
        AXIS_COLOR.stroke_width(1),
      ))
      .map_err(backend_error)?;

    // Unit normal of the axis on screen, pointing away from the plot.
    let (dx, dy) = ((sx1 - sx0) as f64, (sy1 - sy0) as f64);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1.0 {
      continue;
    }
    let (mut nx, mut ny) = (-dy / len, dx / len);
    let mid = ((sx0 + sx1) as f64 / 2.0, (sy0 + sy1) as f64 / 2.0);
    if nx * (mid.0 - center.0) + ny * (mid.1 - center.1) < 0.0 {
      nx = -nx;
      ny = -ny;
    }

    let along = |t: f64| {
      let t = if flipped[axis] { 1.0 - t } else { t };
      screen(Point3D {
        x: origin.x + (end.x - origin.x) * t,
        y: origin.y + (end.y - origin.y) * t,
        z: origin.z + (end.z - origin.z) * t,
      })
    };
    let offset = |(x, y): (i32, i32), dist: f64| {
      (
        x + (nx * dist).round() as i32,
        y + (ny * dist).round() as i32,
      )
    };

    for tick in axis_ticks((val_min, val_max), 4) {
      let at = along(((tick - val_min) / (val_max - val_min)).clamp(0.0, 1.0));
      area
        .draw(&PathElement::new(
          vec![at, offset(at, 4.0)],
          AXIS_COLOR.stroke_width(1),
        ))
        .map_err(backend_error)?;
      area
        .draw(&Text::new(
          format_tick(tick),
          offset(at, 14.0),
          label_style.clone(),
        ))
        .map_err(backend_error)?;
    }

    area
      .draw(&Text::new(
        names[axis],
        offset(along(0.5), 32.0),
        name_style.clone(),
      ))
      .map_err(backend_error)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::PlotMode;
  use crate::sampling::{DOMAIN, Deadline, GRID_RESOLUTION, Interval, sample_2d};

  #[test]
  fn viridis_ends() {
    assert_eq!(viridis(0.0), RGBColor(68, 1, 84));
    assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
    assert_eq!(viridis(f64::NAN), RGBColor(68, 1, 84));
  }

  #[test]
  fn mesh_indices_cover_grid() {
    let indices = mesh_indices(0, 399);
    assert_eq!(indices.len(), MESH + 1);
    assert_eq!(indices[0], 0);
    assert_eq!(indices[MESH], 399);
    assert_eq!(mesh_indices(0, 2), vec![0, 1, 2]);
    assert_eq!(mesh_indices(196, 204), (196..=204).collect::<Vec<_>>());
  }

  #[test]
  fn small_valid_region_gets_a_mesh() {
    let expr = PlotMode::Surface
      .parse("z = sqrt(0.05 - x**2 - y**2)")
      .unwrap();
    let grid = sample_2d(
      &expr,
      DOMAIN,
      DOMAIN,
      GRID_RESOLUTION,
      &Deadline::none(),
    )
    .unwrap();
    assert!(grid.valid_count() > 0);
    let triangles = build_triangles(
      &grid,
      &Camera::default(),
      (-10.0, 10.0),
      (-10.0, 10.0),
      grid.z_range().unwrap(),
    );
    assert!(!triangles.is_empty());
  }

  #[test]
  fn ticks_stay_bounded_at_large_offsets() {
    let ticks = axis_ticks((1e20, 1e20 + 16384.0), 4);
    assert!(ticks.len() <= MAX_TICKS);
    assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(axis_ticks((0.0, 20.0), 4), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    assert!(axis_ticks((1.0, 1.0), 4).is_empty());
  }

  #[test]
  fn nan_cells_are_skipped() {
    let domain = Interval::new(-1.0, 1.0);
    let grid = sample_2d(
      &|x: f64, _y: f64| if x > 0.0 { f64::NAN } else { x },
      domain,
      domain,
      11,
      &Deadline::none(),
    )
    .unwrap();
    let full = 2 * 10 * 10;
    let triangles = build_triangles(
      &grid,
      &Camera::default(),
      (-1.0, 1.0),
      (-1.0, 1.0),
      (-1.0, 0.0),
    );
    assert!(!triangles.is_empty());
    assert!(triangles.len() < full);
  }

  #[test]
  fn triangles_are_back_to_front() {
    let domain = Interval::new(-1.0, 1.0);
    let grid = sample_2d(
      &|x: f64, y: f64| x * y,
      domain,
      domain,
      6,
      &Deadline::none(),
    )
    .unwrap();
    let triangles = build_triangles(
      &grid,
      &Camera::default(),
      (-1.0, 1.0),
      (-1.0, 1.0),
      (-1.0, 1.0),
    );
    assert!(triangles.windows(2).all(|w| w[0].depth >= w[1].depth));
  }

  #[test]
  fn tick_formatting() {
    assert_eq!(format_tick(5.0), "5");
    assert_eq!(format_tick(-2.5), "-2.5");
    assert_eq!(nice_step(20.0, 4), 5.0);
    assert_eq!(format_tick(1e20), "1e20");
  }
}
