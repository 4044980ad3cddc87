//! End-to-end behavior of configured module graphs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mrs_graph::behaviors::{AnalyticPulse, GradientPulse, Parameters, Sequence};
use mrs_graph::{
    EngineOptions, EvalStrategy, ModuleId, PrepareMode, Severity, SimContext, Value,
};
use mrs_native::CompilerCommand;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn interpreted() -> EngineOptions {
    EngineOptions::default().with_strategy(EvalStrategy::Interpreted)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

/// `G1.Duration = 5`, `G2.Area = a1*2` observing `G1.Duration`.
fn duration_and_area(options: EngineOptions) -> (SimContext, ModuleId, ModuleId) {
    let mut ctx = SimContext::new(options);
    let root = ctx.add_module(None, "Seq", Sequence).unwrap();
    let g1 = ctx.add_module(Some(root), "G1", GradientPulse).unwrap();
    let g2 = ctx.add_module(Some(root), "G2", GradientPulse).unwrap();
    ctx.configure(g1, "Duration", "5").unwrap();
    ctx.configure(g2, "Observe", "G1.Duration").unwrap();
    ctx.configure(g2, "Area", "a1*2").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    (ctx, g1, g2)
}

/// Every `(attribute, value, subjects, observers)` in the context.
fn snapshot(ctx: &SimContext) -> Vec<(String, Value, usize, usize)> {
    let mut rows = Vec::new();
    for (_, module) in ctx.modules() {
        for attr in module.attributes() {
            let attribute = ctx.attribute(*attr).unwrap();
            rows.push((
                ctx.qualified_name(*attr),
                attribute.value().clone(),
                attribute.subjects().len(),
                attribute.observers().len(),
            ));
        }
    }
    rows
}

fn assert_links_mutual(ctx: &SimContext) {
    for (_, module) in ctx.modules() {
        for &attr in module.attributes() {
            let attribute = ctx.attribute(attr).unwrap();
            for &subject in attribute.subjects() {
                let subject = ctx.attribute(subject).unwrap();
                assert!(subject.observers().contains(&attr));
            }
            for &observer in attribute.observers() {
                let observer = ctx.attribute(observer).unwrap();
                assert!(observer.subjects().contains(&attr));
            }
        }
    }
}

#[test]
fn test_write_propagates_in_one_cascade() {
    let (mut ctx, g1, g2) = duration_and_area(interpreted());
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);

    let area = ctx.find_attribute(g2, "Area").unwrap();
    ctx.reset_stats();
    assert!(ctx.write(g1, "Duration", 7.0).unwrap());
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 14.0);
    assert_eq!(ctx.stats().cascades, 1);
    assert_eq!(ctx.stats().notifications(area), 1);

    // Same value again: no cascade.
    assert!(!ctx.write(g1, "Duration", 7.0).unwrap());
    assert_eq!(ctx.stats().cascades, 1);
}

#[test]
fn test_missing_compiler_falls_back_once() {
    let scratch = tempfile::tempdir().unwrap();
    let options = EngineOptions::default()
        .with_compiler(CompilerCommand::Cc {
            program: "/nonexistent/bin/mrs-cc".to_owned(),
        })
        .with_scratch_dir(scratch.path());
    let mut ctx = SimContext::new(options);

    let mut pulses = Vec::new();
    for name in ["A1", "A2", "A3"] {
        let a = ctx.add_module(None, name, AnalyticPulse).unwrap();
        ctx.configure(a, "Shape", "c1*T + 1").unwrap();
        ctx.configure(a, "Constants", "3").unwrap();
        pulses.push(a);
    }
    assert!(ctx.prepare_all(PrepareMode::Init));

    for &pulse in &pulses {
        for i in 0..10 {
            let t = f64::from(i) * 0.5;
            let value = AnalyticPulse::shape_at(&mut ctx, pulse, t).unwrap();
            assert_eq!(value, 3.0 * t + 1.0);
        }
    }
    assert!(ctx.native_fallback_active());
    assert_eq!(ctx.diagnostics().count(Severity::Warning), 1);
    assert_eq!(ctx.stats().compiled_calls, 0);
}

#[test]
fn test_nan_subject_leaves_dependent_unchanged() {
    let (mut ctx, g1, g2) = duration_and_area(interpreted());
    ctx.write(g1, "Duration", f64::NAN).unwrap();
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
    assert!(ctx.stats().skipped_nan >= 1);
    assert_eq!(ctx.stats().eval_errors, 0);
}

#[test]
fn test_prepare_is_idempotent() {
    let mut ctx = SimContext::new(interpreted());
    let root = ctx.add_module(None, "Seq", Sequence).unwrap();
    let params = ctx.add_module(Some(root), "P", Parameters).unwrap();
    let g = ctx.add_module(Some(root), "G", GradientPulse).unwrap();
    let a = ctx.add_module(Some(root), "A", AnalyticPulse).unwrap();
    ctx.configure(params, "TR", "10").unwrap();
    ctx.configure(g, "Observe", "P.TR, P.FOVx=fov").unwrap();
    ctx.configure(g, "Duration", "a1/2").unwrap();
    ctx.configure(g, "Area", "fov*a1").unwrap();
    ctx.configure(a, "Observe", "G.Duration").unwrap();
    ctx.configure(a, "Duration", "a1").unwrap();
    ctx.configure(a, "Shape", "sin(T/a1)").unwrap();

    assert!(ctx.prepare_all(PrepareMode::Init));
    let first = snapshot(&ctx);
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(snapshot(&ctx), first);
    assert!(ctx.prepare_all(PrepareMode::Verbose));
    assert_eq!(snapshot(&ctx), first);
    assert!(ctx.diagnostics().is_empty());
    assert_eq!(ctx.get::<f64>(g, "Area").unwrap(), 1000.0);
    assert_links_mutual(&ctx);
}

#[test]
fn test_links_stay_mutual_through_rebinds_and_removal() {
    let (mut ctx, g1, g2) = duration_and_area(interpreted());
    let g3 = ctx.add_module(None, "G3", GradientPulse).unwrap();
    ctx.configure(g3, "Observe", "G1.Duration, G2.Area").unwrap();
    ctx.configure(g3, "Duration", "a1 + a2").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g3, "Duration").unwrap(), 15.0);
    assert_links_mutual(&ctx);

    ctx.configure(g2, "Area", "a1*a1").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g3, "Duration").unwrap(), 30.0);
    assert_links_mutual(&ctx);

    assert!(ctx.remove_module(g2));
    assert_links_mutual(&ctx);
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    assert_eq!(ctx.attribute(duration).unwrap().observers().len(), 1);
}

#[test]
fn test_compiled_matches_interpreted() {
    let scratch = tempfile::tempdir().unwrap();
    let native = EngineOptions::default()
        .with_compiler(CompilerCommand::detect())
        .with_scratch_dir(scratch.path());

    let build = |options: EngineOptions| {
        let mut ctx = SimContext::new(options);
        let g = ctx.add_module(None, "G", Sequence).unwrap();
        let a = ctx.add_module(None, "A", AnalyticPulse).unwrap();
        ctx.configure(g, "Duration", "3").unwrap();
        ctx.configure(a, "Observe", "G.Duration").unwrap();
        ctx.configure(a, "Constants", "1.5, 0.25").unwrap();
        ctx.configure(a, "Shape", "c1*sin(2*Pi*T/a1)*exp(-T) + c2*T^2 - floor(T)")
            .unwrap();
        assert!(ctx.prepare_all(PrepareMode::Init));
        (ctx, a)
    };
    let (mut compiled, a_compiled) = build(native);
    let (mut interpreted, a_interpreted) = build(interpreted());

    for i in 0..150 {
        let t = f64::from(i) * 0.041 - 2.0;
        let x = AnalyticPulse::shape_at(&mut compiled, a_compiled, t).unwrap();
        let y = AnalyticPulse::shape_at(&mut interpreted, a_interpreted, t).unwrap();
        assert!(close(x, y), "t={t}: {x} vs {y}");
    }
    if compiled.native_fallback_active() {
        eprintln!("native tier unavailable, both sides interpreted");
    } else {
        assert_eq!(compiled.stats().compiled_calls, 150);
    }
}

proptest! {
    #[test]
    fn substitution_matches_direct_evaluation(
        duration in -1.0e3f64..1.0e3,
        slew in -1.0e3f64..1.0e3,
    ) {
        let mut ctx = SimContext::new(interpreted());
        let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
        let g2 = ctx.add_module(None, "G2", GradientPulse).unwrap();
        ctx.configure(g2, "Observe", "G1.Duration, G1.SlewRate=s").unwrap();
        ctx.configure(g2, "Area", "a1*s - a1/4 + 3").unwrap();
        prop_assert!(ctx.prepare_all(PrepareMode::Init));

        ctx.write(g1, "Duration", duration).unwrap();
        ctx.write(g1, "SlewRate", slew).unwrap();
        let expected = duration * slew - duration / 4.0 + 3.0;
        let area = ctx.get::<f64>(g2, "Area").unwrap();
        prop_assert!(close(area, expected), "{} vs {}", area, expected);
    }

    #[test]
    fn linear_shape_derivative_is_its_slope(slope in -50.0f64..50.0, t in -10.0f64..10.0) {
        let mut ctx = SimContext::new(interpreted());
        let a = ctx.add_module(None, "A", AnalyticPulse).unwrap();
        ctx.configure(a, "Shape", "c1*T*T/2").unwrap();
        ctx.configure(a, "Constants", &slope.to_string()).unwrap();
        ctx.configure(a, "Diff", "1").unwrap();
        prop_assert!(ctx.prepare_all(PrepareMode::Init));
        let value = AnalyticPulse::shape_at(&mut ctx, a, t).unwrap();
        prop_assert!(close(value, slope * t), "{} vs {}", value, slope * t);
    }
}
