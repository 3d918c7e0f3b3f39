use plotbot::syntax::Function;
use plotbot::{Expression, PlotMode, Violation};
use proptest::prelude::*;

fn eval_x(formula: &str, x: f64) -> Result<f64, Violation> {
  Expression::parse(formula, &["x"])
    .unwrap()
    .evaluate(&[("x", x)])
    .map_err(|e| e.violation)
}

mod evaluator_tests {
  use super::*;

  mod values {
    use super::*;

    #[test]
    fn square() {
      assert_eq!(eval_x("x**2", 0.0), Ok(0.0));
      assert_eq!(eval_x("x**2", 10.0), Ok(100.0));
      assert_eq!(eval_x("x^2", -3.0), Ok(9.0));
    }

    #[test]
    fn constants() {
      assert_eq!(eval_x("pi", 0.0), Ok(std::f64::consts::PI));
      assert!((eval_x("log(e)", 0.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn functions() {
      assert_eq!(eval_x("sqrt(x)", 16.0), Ok(4.0));
      assert_eq!(eval_x("abs(x)", -2.5), Ok(2.5));
      assert!((eval_x("log10(x)", 1000.0).unwrap() - 3.0).abs() < 1e-12);
      assert_eq!(eval_x("exp(0)", 0.0), Ok(1.0));
      assert!((eval_x("atan(x)", 1.0).unwrap() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn unary_signs() {
      assert_eq!(eval_x("--x", 2.0), Ok(2.0));
      assert_eq!(eval_x("+x", 2.0), Ok(2.0));
      assert_eq!(eval_x("2^-1", 0.0), Ok(0.5));
    }

    #[test]
    fn extra_bindings_are_ignored() {
      let expr = Expression::parse("x + 1", &["x"]).unwrap();
      assert_eq!(expr.evaluate(&[("y", 5.0), ("x", 1.0)]).unwrap(), 2.0);
    }

    #[test]
    fn surface_formulas_of_the_menu_prompt() {
      let expr = PlotMode::Surface.parse("z = cos(x) * sin(y)").unwrap();
      assert_eq!(expr.evaluate_at(&[0.0, 0.0]).unwrap(), 0.0);
      let expr = PlotMode::Surface.parse("z = sin(sqrt(x**2 + y**2))").unwrap();
      assert!((expr.evaluate_at(&[3.0, 4.0]).unwrap() - 5.0_f64.sin()).abs() < 1e-12);
    }
  }

  mod domain_errors {
    use super::*;

    #[test]
    fn sqrt_of_negative() {
      assert_eq!(eval_x("sqrt(x)", -1.0), Err(Violation::SqrtOfNegative));
    }

    #[test]
    fn log_of_non_positive() {
      assert_eq!(eval_x("log(x)", 0.0), Err(Violation::LogOfNonPositive));
      assert_eq!(eval_x("ln(x)", -1.0), Err(Violation::LogOfNonPositive));
    }

    #[test]
    fn inverse_trig_outside_unit_interval() {
      assert_eq!(
        eval_x("acos(x)", 2.0),
        Err(Violation::OutsideDomain(Function::Acos))
      );
    }

    #[test]
    fn division_by_zero() {
      assert_eq!(eval_x("1 / x", 0.0), Err(Violation::DivisionByZero));
      assert_eq!(eval_x("x ** -1", 0.0), Err(Violation::DivisionByZero));
    }

    #[test]
    fn non_real_power() {
      assert_eq!(eval_x("x ** 0.5", -4.0), Err(Violation::NonReal));
    }

    #[test]
    fn overflow_is_not_finite() {
      assert_eq!(eval_x("exp(x)", 1000.0), Err(Violation::NonFinite));
    }

    #[test]
    fn missing_binding() {
      let expr = Expression::parse("x * y", &["x", "y"]).unwrap();
      let err = expr.evaluate(&[("x", 1.0)]).unwrap_err();
      assert_eq!(err.violation, Violation::Unbound("y".into()));
    }

    #[test]
    fn error_names_the_point() {
      let expr = Expression::parse("sqrt(x)", &["x"]).unwrap();
      let err = expr.evaluate(&[("x", -1.0)]).unwrap_err();
      assert_eq!(err.point, vec![("x".to_string(), -1.0)]);
      assert_eq!(
        err.to_string(),
        "square root of a negative number at x = -1"
      );
    }
  }

  mod properties {
    use super::*;

    proptest! {
      #[test]
      fn evaluation_is_deterministic(x in -1.0e6..1.0e6f64) {
        let expr = Expression::parse("sin(x) * x**2 - 3 / (1 + abs(x))", &["x"]).unwrap();
        prop_assert_eq!(expr.evaluate_at(&[x]), expr.evaluate_at(&[x]));
      }

      #[test]
      fn square_matches_multiplication(x in -1.0e3..1.0e3f64) {
        let value = eval_x("x**2", x).unwrap();
        prop_assert!((value - x * x).abs() <= 1e-12 * (x * x).max(1.0));
      }

      #[test]
      fn pythagorean_identity(x in -100.0..100.0f64) {
        let value = eval_x("sin(x)**2 + cos(x)**2", x).unwrap();
        prop_assert!((value - 1.0).abs() < 1e-12);
      }

      #[test]
      fn results_are_finite_or_errors(x in proptest::num::f64::ANY) {
        let expr = Expression::parse("tan(x) / x + log(abs(x))", &["x"]).unwrap();
        if let Ok(value) = expr.evaluate_at(&[x]) {
          prop_assert!(value.is_finite());
        }
      }
    }
  }
}
