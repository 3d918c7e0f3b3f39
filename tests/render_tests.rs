use std::time::Duration;

use plotbot::render::implicit::zero_contour;
use plotbot::render::{SampledData, Style, render};
use plotbot::sampling::{
  Curve, DOMAIN, Deadline, GRID_RESOLUTION, sample_2d,
};
use plotbot::{Dispatcher, PlotError, PlotMode, Plotter, RenderError};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn small() -> Dispatcher {
  Dispatcher::new(
    Style {
      width: 320,
      height: 240,
    },
    None,
  )
}

mod render_tests {
  use super::*;

  mod explicit {
    use super::*;

    #[test]
    fn renders_png_of_configured_size() {
      let artifact = small().plot(PlotMode::Explicit, "y = x**2").unwrap();
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
      let image = image::load_from_memory(&artifact.png).unwrap();
      assert_eq!((image.width(), image.height()), (320, 240));
      assert_eq!(artifact.title, "Explicit function");
      assert_eq!(artifact.axis_labels, vec!["X", "Y"]);
    }

    #[test]
    fn default_size_is_640_by_480() {
      let artifact = Dispatcher::default()
        .plot(PlotMode::Explicit, "sin(x)")
        .unwrap();
      let image = image::load_from_memory(&artifact.png).unwrap();
      assert_eq!((image.width(), image.height()), (640, 480));
    }

    #[test]
    fn singularities_do_not_abort() {
      assert!(small().plot(PlotMode::Explicit, "1 / x").is_ok());
      assert!(small().plot(PlotMode::Explicit, "log(x)").is_ok());
    }

    #[test]
    fn constant_function() {
      assert!(small().plot(PlotMode::Explicit, "y = 3").is_ok());
    }

    #[test]
    fn nowhere_defined() {
      let err = small()
        .plot(PlotMode::Explicit, "sqrt(-1 - x**2)")
        .unwrap_err();
      assert!(matches!(
        err,
        PlotError::Render(RenderError::NoValidSamples)
      ));
    }

    #[test]
    fn overflowing_range_is_rejected() {
      let err = small().plot(PlotMode::Explicit, "y = 1e307*x").unwrap_err();
      assert!(matches!(err, PlotError::Render(RenderError::RangeTooLarge)));
    }

    #[test]
    fn large_offset_renders() {
      assert!(small().plot(PlotMode::Explicit, "y = 1e20 + x").is_ok());
      assert!(
        small()
          .plot(PlotMode::Explicit, "y = 1e20 + 500*(x+10)")
          .is_ok()
      );
    }

    #[test]
    fn parse_errors_come_first() {
      let err = small().plot(PlotMode::Explicit, "x +* 2").unwrap_err();
      assert!(matches!(err, PlotError::Parse(_)));
    }
  }

  mod implicit {
    use super::*;

    #[test]
    fn unit_circle_contour_has_radius_one() {
      let expr = PlotMode::Implicit.parse("x**2 + y**2 = 1").unwrap();
      let grid = sample_2d(
        &expr,
        DOMAIN,
        DOMAIN,
        GRID_RESOLUTION,
        &Deadline::none(),
      )
      .unwrap();
      let segments = zero_contour(&grid);
      assert!(segments.len() > 20);
      for (a, b) in segments {
        for (x, y) in [a, b] {
          let r = (x * x + y * y).sqrt();
          assert!((r - 1.0).abs() < 0.01, "point ({x}, {y}) has radius {r}");
        }
      }
    }

    #[test]
    fn title_names_formula() {
      let artifact = small()
        .plot(PlotMode::Implicit, "x**2 + y**2 - 1 = 0")
        .unwrap();
      assert_eq!(artifact.title, "Implicit function: x**2 + y**2 - 1 = 0");
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn relation_without_zero_set_still_renders() {
      assert!(small().plot(PlotMode::Implicit, "x**2 + y**2 = -1").is_ok());
    }
  }

  mod surface {
    use super::*;

    #[test]
    fn partially_defined_surface_renders() {
      let artifact = small()
        .plot(PlotMode::Surface, "z = sqrt(100 - x**2 - y**2)")
        .unwrap();
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
      assert_eq!(artifact.title, "3D plot: z = sqrt(100 - x**2 - y**2)");
      assert_eq!(artifact.axis_labels, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn menu_examples_render() {
      for formula in ["z = cos(x) * sin(y)", "z = sin(sqrt(x**2 + y**2))"] {
        assert!(small().plot(PlotMode::Surface, formula).is_ok(), "{formula}");
      }
    }

    #[test]
    fn flat_surface_renders() {
      assert!(small().plot(PlotMode::Surface, "z = 1").is_ok());
    }

    #[test]
    fn large_offset_renders() {
      let artifact = small()
        .plot(PlotMode::Surface, "z = 1e20 + 500*(x+10)")
        .unwrap();
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn overflowing_range_is_rejected() {
      let err = small().plot(PlotMode::Surface, "z = 1e307*x").unwrap_err();
      assert!(matches!(err, PlotError::Render(RenderError::RangeTooLarge)));
    }

    #[test]
    fn small_valid_region_renders() {
      let artifact = small()
        .plot(PlotMode::Surface, "z = sqrt(0.05 - x**2 - y**2)")
        .unwrap();
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn entirely_invalid_surface_fails() {
      let err = small()
        .plot(PlotMode::Surface, "z = log(-1 - x**2 - y**2)")
        .unwrap_err();
      assert!(matches!(
        err,
        PlotError::Render(RenderError::NoValidSamples)
      ));
    }
  }

  mod dispatch {
    use super::*;

    #[test]
    fn zero_timeout_expires() {
      let dispatcher = Dispatcher::new(Style::default(), Some(Duration::ZERO));
      let err = dispatcher.plot(PlotMode::Surface, "x * y").unwrap_err();
      assert!(matches!(
        err,
        PlotError::Render(RenderError::TimedOut { .. })
      ));
    }

    #[test]
    fn mismatched_samples_are_rejected() {
      let curve = Curve {
        points: vec![(0.0, 0.0), (1.0, 1.0)],
      };
      let err = render(
        PlotMode::Surface,
        &SampledData::Curve(curve),
        "x",
        &Style::default(),
      )
      .unwrap_err();
      assert!(matches!(err, RenderError::Backend(_)));
    }

    #[test]
    fn render_from_samples() {
      let curve = Curve {
        points: vec![(0.0, 0.0), (1.0, 1.0), (2.0, f64::NAN), (3.0, 2.0)],
      };
      let artifact = render(
        PlotMode::Explicit,
        &SampledData::Curve(curve),
        "x",
        &Style::default(),
      )
      .unwrap();
      assert_eq!(artifact.mode, PlotMode::Explicit);
      assert!(artifact.png.starts_with(PNG_SIGNATURE));
    }
  }
}
