#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use crate::behaviors::{GradientPulse, Parameters};
use crate::{EngineOptions, EvalStrategy, Evaluation, ObserveCandidate, SimContext};

fn context() -> SimContext {
    SimContext::new(EngineOptions::default().with_strategy(EvalStrategy::Interpreted))
}

#[test]
fn test_literal_is_not_evaluated() {
    let mut ctx = context();
    let g = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let area = ctx.find_attribute(g, "Area").unwrap();
    assert_eq!(ctx.eval_expression(area), Ok(Evaluation::Literal));
    assert_eq!(ctx.stats().evaluations, 0);
}

#[test]
fn test_nan_subject_keeps_previous_value() {
    let mut ctx = context();
    let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let g2 = ctx.add_module(None, "G2", GradientPulse).unwrap();
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    let area = ctx.find_attribute(g2, "Area").unwrap();
    ctx.write(g1, "Duration", 5.0).unwrap();
    ctx.set_member(area, "a1*2", &[ObserveCandidate::new(duration, "a1")])
        .unwrap();

    ctx.write(g1, "Duration", f64::NAN).unwrap();
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
    assert_eq!(ctx.eval_expression(area), Ok(Evaluation::SkippedNan));
    assert_eq!(ctx.stats().skipped_nan, 2);

    ctx.write(g1, "Duration", 6.0).unwrap();
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 12.0);
}

#[test]
fn test_result_cast_to_attribute_kind() {
    let mut ctx = context();
    let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let params = ctx.add_module(None, "P", Parameters).unwrap();
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    let nx = ctx.find_attribute(params, "Nx").unwrap();
    ctx.write(g1, "Duration", 10.0).unwrap();

    ctx.set_member(nx, "a1/3", &[ObserveCandidate::new(duration, "a1")])
        .unwrap();
    assert_eq!(ctx.get::<i32>(params, "Nx").unwrap(), 3);

    ctx.write(g1, "Duration", -7.5).unwrap();
    assert_eq!(ctx.get::<i32>(params, "Nx").unwrap(), -2);
}

#[test]
fn test_unchanged_result_does_not_notify() {
    let mut ctx = context();
    let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let g2 = ctx.add_module(None, "G2", GradientPulse).unwrap();
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    let area = ctx.find_attribute(g2, "Area").unwrap();
    ctx.set_member(area, "floor(a1)", &[ObserveCandidate::new(duration, "a1")])
        .unwrap();
    ctx.write(g1, "Duration", 2.2).unwrap();

    assert_eq!(
        ctx.eval_expression(area),
        Ok(Evaluation::Written { changed: false })
    );
    let changes = ctx.stats().state_changes;
    ctx.write(g1, "Duration", 2.7).unwrap();
    // Duration changed, Area stayed at 2.
    assert_eq!(ctx.stats().state_changes, changes + 1);
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 2.0);
}
