//! Raster canvas shared by every plot mode.

use std::fmt::Display;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock, PoisonError};

use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use tracing::{debug, error};

use super::Style;
use crate::RenderError;

pub(crate) const FONT_FAMILY: &str = "sans-serif";

static FONT: &[u8] =
  include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSans.ttf"));

static FONT_LOADED: OnceLock<bool> = OnceLock::new();

/// The drawing backend keeps global font state; one plot at a time.
static RENDER_LOCK: Mutex<()> = Mutex::new(());

pub(crate) type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn ensure_font() -> Result<(), RenderError> {
  let loaded = *FONT_LOADED.get_or_init(|| {
    match register_font(FONT_FAMILY, FontStyle::Normal, FONT) {
      Ok(()) => true,
      Err(_) => {
        error!("embedded plot font could not be parsed");
        false
      }
    }
  });
  if loaded { Ok(()) } else { Err(RenderError::Font) }
}

pub(crate) fn backend_error(e: impl Display) -> RenderError {
  RenderError::Backend(format!("Plot: {e}"))
}

/// Draw onto a white RGB canvas of the style's size and return it PNG
/// encoded.
pub(crate) fn render_png<F>(style: &Style, draw: F) -> Result<Vec<u8>, RenderError>
where
  F: FnOnce(&Canvas<'_>) -> Result<(), RenderError>,
{
  ensure_font()?;
  let _guard = RENDER_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

  let (width, height) = (style.width, style.height);
  let mut buf = vec![0u8; width as usize * height as usize * 3];
  {
    let root = BitMapBackend::with_buffer(&mut buf, (width, height))
      .into_drawing_area();
    root.fill(&WHITE).map_err(backend_error)?;
    draw(&root)?;
    root.present().map_err(backend_error)?;
  }

  let image = RgbImage::from_raw(width, height, buf).ok_or_else(|| {
    RenderError::Encode(format!("buffer does not match {width}x{height}"))
  })?;
  let mut png = Cursor::new(Vec::new());
  image
    .write_to(&mut png, ImageFormat::Png)
    .map_err(|e| RenderError::Encode(e.to_string()))?;
  let png = png.into_inner();
  debug!(width, height, bytes = png.len(), "encoded png");
  Ok(png)
}

/// Spans below this fraction of the values' magnitude are drawn as flat.
const FLAT_RELATIVE: f64 = 1e-9;

/// Largest span handed to the backend, with headroom for its own
/// arithmetic on the span.
const MAX_SPAN: f64 = f64::MAX / 16.0;

fn is_flat(lo: f64, hi: f64) -> bool {
  hi - lo <= (lo.abs().max(hi.abs()) * FLAT_RELATIVE).max(1e-12)
}

fn checked((lo, hi): (f64, f64)) -> Result<(f64, f64), RenderError> {
  if lo.is_finite() && hi.is_finite() && hi - lo <= MAX_SPAN {
    Ok((lo, hi))
  } else {
    Err(RenderError::RangeTooLarge)
  }
}

/// Widen a value range by 5% on each side. A flat range is widened around
/// its value by 5% of the magnitude, at least 1.
pub(crate) fn padded_range(
  (lo, hi): (f64, f64),
) -> Result<(f64, f64), RenderError> {
  let pad = if is_flat(lo, hi) {
    (lo.abs().max(hi.abs()) * 0.05).max(1.0)
  } else {
    0.05 * hi - 0.05 * lo
  };
  checked((lo - pad, hi + pad))
}

/// The range as is, unless it is flat (then padded) or its span overflows.
pub(crate) fn value_range(
  (lo, hi): (f64, f64),
) -> Result<(f64, f64), RenderError> {
  if is_flat(lo, hi) {
    padded_range((lo, hi))
  } else {
    checked((lo, hi))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn padded_range_of_constant() {
    assert_eq!(padded_range((3.0, 3.0)).unwrap(), (2.0, 4.0));
  }

  #[test]
  fn padded_range_widens() {
    let (lo, hi) = padded_range((0.0, 10.0)).unwrap();
    assert!((lo + 0.5).abs() < 1e-12);
    assert!((hi - 10.5).abs() < 1e-12);
  }

  #[test]
  fn large_constant_gets_visible_padding() {
    let (lo, hi) = padded_range((1e20, 1e20)).unwrap();
    assert!(lo < 1e20 && hi > 1e20);
    let (lo, hi) = value_range((1e20, 1e20 + 16384.0)).unwrap();
    assert!(hi - lo > 1e18);
  }

  #[test]
  fn overflowing_span_is_rejected() {
    assert!(matches!(
      padded_range((-1e308, 1e308)),
      Err(RenderError::RangeTooLarge)
    ));
    assert!(matches!(
      value_range((-1e308, 1e308)),
      Err(RenderError::RangeTooLarge)
    ));
    assert!(value_range((-1e300, 1e300)).is_ok());
  }

  #[test]
  fn blank_canvas_is_png() {
    let png = render_png(&Style::default(), |_| Ok(())).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
  }
}
