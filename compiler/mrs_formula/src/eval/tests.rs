#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::parse;

fn eval_with(source: &str, values: &[(&str, f64)]) -> Result<Complex64, EvalError> {
    let formula = parse(source).unwrap();
    let mut bindings = Bindings::for_formula(&formula);
    for &(name, value) in values {
        bindings.set_by_name(&formula, name, value);
    }
    formula.eval(&bindings)
}

fn re(source: &str, values: &[(&str, f64)]) -> f64 {
    eval_with(source, values).unwrap().re
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * (1.0 + a.abs().max(b.abs()))
}

#[test]
fn test_scenario_formula() {
    assert_eq!(re("g1_duration*2", &[("g1_duration", 5.0)]), 10.0);
    assert_eq!(re("g1_duration*2", &[("g1_duration", 7.0)]), 14.0);
}

#[test]
fn test_unbound_symbol() {
    assert_eq!(
        eval_with("x + y", &[("x", 1.0)]),
        Err(EvalError::UnboundSymbol {
            name: "y".to_owned()
        })
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        eval_with("1 / x", &[("x", 0.0)]),
        Err(EvalError::DivisionByZero)
    );
    assert_eq!(
        eval_with("mod(x, 0)", &[("x", 3.0)]),
        Err(EvalError::DivisionByZero)
    );
}

#[test]
fn test_power_and_unary_minus() {
    assert_eq!(re("-x^2", &[("x", 3.0)]), -9.0);
    assert_eq!(re("2^-1", &[]), 0.5);
    assert_eq!(re("2^3^2", &[]), 512.0);
    assert_eq!(re("pow(x, 2)", &[("x", 4.0)]), 16.0);
}

#[test]
fn test_imaginary_unit() {
    let value = eval_with("x + 2*I", &[("x", 1.0)]).unwrap();
    assert_eq!(value, Complex64::new(1.0, 2.0));

    let product = eval_with("I*I", &[]).unwrap();
    assert!(close(product.re, -1.0));
    assert!(close(product.im, 0.0));
}

#[test]
fn test_real_functions_leave_real_line_when_undefined() {
    let root = eval_with("sqrt(x)", &[("x", -4.0)]).unwrap();
    assert!(close(root.re, 0.0));
    assert!(close(root.im, 2.0));
    assert_eq!(re("sqrt(x)", &[("x", 9.0)]), 3.0);
}

#[test]
fn test_floor_truncates_toward_zero() {
    assert_eq!(re("floor(x)", &[("x", 2.7)]), 2.0);
    assert_eq!(re("floor(x)", &[("x", -2.7)]), -2.0);
}

#[test]
fn test_mod() {
    assert_eq!(re("mod(7, 3)", &[]), 1.0);
    assert_eq!(re("mod(x, 3)", &[("x", -7.0)]), -1.0);
    assert!(close(re("mod(x, 0.5)", &[("x", 1.25)]), 0.25));
}

#[test]
fn test_comparisons_and_ite() {
    assert_eq!(re("equal(x, 2)", &[("x", 2.0)]), 1.0);
    assert_eq!(re("equal(x, 2)", &[("x", 3.0)]), 0.0);
    assert_eq!(re("gt(x, 2)", &[("x", 3.0)]), 1.0);
    assert_eq!(re("lt(x, 2)", &[("x", 3.0)]), 0.0);
    assert_eq!(re("ite(x, 1, 10, 20)", &[("x", 1.0)]), 10.0);
    assert_eq!(re("ite(x, 1, 10, 20)", &[("x", 0.0)]), 20.0);
}

#[test]
fn test_csgn_and_step() {
    assert_eq!(re("csgn(x)", &[("x", -0.5)]), -1.0);
    assert_eq!(re("step(x)", &[("x", 0.5)]), 1.0);
    assert_eq!(re("csgn(0)", &[]), 0.0);
    assert_eq!(re("csgn(-I)", &[]), -1.0);
}

#[test]
fn test_vector_lookup() {
    let formula = parse("Vector(i) * 2").unwrap();
    let mut bindings = Bindings::for_formula(&formula).with_vector(vec![1.0, 2.5, 4.0]);
    for (index, expected) in [(0.0, 2.0), (1.9, 5.0), (2.0, 8.0), (3.0, 0.0), (-1.0, 0.0)] {
        bindings.set_by_name(&formula, "i", index);
        assert_eq!(formula.eval_real(&bindings).unwrap(), expected);
    }
}

#[test]
fn test_constants() {
    assert!(close(re("Pi", &[]), std::f64::consts::PI));
    assert!(close(re("log(E)", &[]), 1.0));
    assert!(close(re("atan2(1, 1)", &[]), std::f64::consts::FRAC_PI_4));
}

#[test]
fn test_nan_input_propagates() {
    assert!(re("x * 2", &[("x", f64::NAN)]).is_nan());
}
