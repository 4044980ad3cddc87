#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::f64::consts::PI;

use pretty_assertions::assert_eq;

use crate::behaviors::{AnalyticPulse, GradientPulse, Parameters, Sequence};
use crate::{
    CascadePolicy, EngineOptions, EvalStrategy, ModuleId, PrepareMode, Severity, SimContext,
};

fn options() -> EngineOptions {
    EngineOptions::default().with_strategy(EvalStrategy::Interpreted)
}

/// `Root` holding gradients `G1` and `G2`, with `config` applied to each.
fn graph(
    options: EngineOptions,
    g1: &[(&str, &str)],
    g2: &[(&str, &str)],
) -> (SimContext, ModuleId, ModuleId) {
    let mut ctx = SimContext::new(options);
    let root = ctx.add_module(None, "Root", Sequence).unwrap();
    let m1 = ctx.add_module(Some(root), "G1", GradientPulse).unwrap();
    let m2 = ctx.add_module(Some(root), "G2", GradientPulse).unwrap();
    for (key, text) in g1 {
        ctx.configure(m1, key, text).unwrap();
    }
    for (key, text) in g2 {
        ctx.configure(m2, key, text).unwrap();
    }
    (ctx, m1, m2)
}

#[test]
fn test_configured_formula() {
    let (mut ctx, g1, g2) = graph(
        options(),
        &[("Duration", "5")],
        &[("Observe", "G1.Duration"), ("Area", "a1*2")],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
    assert!(ctx.has_formula(g2, "Area"));
    assert!(!ctx.has_formula(g1, "Duration"));
    assert_eq!(ctx.get::<String>(g2, "Observe").unwrap(), "G1.Duration");
}

#[test]
fn test_positional_and_named_placeholders() {
    let (mut ctx, _, g2) = graph(
        options(),
        &[("Duration", "5"), ("SlewRate", "0.5")],
        &[
            ("Observe", "G1.Duration, G1.SlewRate=s"),
            ("Area", "a1 + s"),
        ],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 5.5);
    let observed = ctx.module(g2).unwrap().observed();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].placeholder, "a1");
    assert_eq!(observed[1].placeholder, "s");
}

#[test]
fn test_constant_formula_as_literal() {
    let (mut ctx, g1, _) = graph(options(), &[("Duration", "2*Pi")], &[]);
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g1, "Duration").unwrap(), 2.0 * PI);
    assert!(!ctx.has_formula(g1, "Duration"));
}

#[test]
fn test_vector_lookup() {
    let (mut ctx, _, g2) = graph(
        options(),
        &[("Duration", "1")],
        &[
            ("Vector", "10 20 30"),
            ("Observe", "G1.Duration"),
            ("Area", "Vector(a1) + Vector(7)"),
        ],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.module(g2).unwrap().vector(), &[10.0, 20.0, 30.0]);
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 20.0);
}

#[test]
fn test_errors_reported_only_when_verbose() {
    let (mut ctx, _, _) = graph(
        options(),
        &[("Bogus", "1"), ("Area", "foo*2")],
        &[("Observe", "Nowhere.Duration, G1")],
    );

    assert!(!ctx.prepare_all(PrepareMode::Init));
    assert!(ctx.diagnostics().is_empty());

    assert!(!ctx.prepare_all(PrepareMode::Verbose));
    let diagnostics = ctx.take_diagnostics();
    let messages: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
    assert_eq!(diagnostics.len(), 4, "{messages:#?}");
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Error));
    assert!(messages.iter().any(|m| m.contains("unknown attribute `Bogus`")));
    assert!(messages.iter().any(|m| m.contains("`foo`")));
    assert!(messages.iter().any(|m| m.contains("no module named `Nowhere`")));
    assert!(messages.iter().any(|m| m.contains("malformed Observe entry `G1`")));
}

#[test]
fn test_observed_module_prepared_first() {
    let mut ctx = SimContext::new(options());
    let g2 = ctx.add_module(None, "G2", GradientPulse).unwrap();
    let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
    ctx.configure(g1, "Duration", "5").unwrap();
    ctx.configure(g2, "Observe", "G1.Duration").unwrap();
    ctx.configure(g2, "Area", "a1*2").unwrap();

    assert!(ctx.prepare(g2, PrepareMode::Init));
    assert!(ctx.module(g1).unwrap().is_prepared());
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
}

#[test]
fn test_name_renames_module() {
    let (mut ctx, g1, g2) = graph(
        options(),
        &[("Name", "Slice"), ("Duration", "3")],
        &[("Observe", "Slice.Duration"), ("Area", "a1")],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.find_module("Slice"), Some(g1));
    assert_eq!(ctx.module(g1).unwrap().name(), "Slice");
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    assert_eq!(ctx.symbol_of(duration).unwrap(), "slice_duration");
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 3.0);
}

#[test]
fn test_reinit_rebinds_changed_configuration() {
    let (mut ctx, g1, g2) = graph(
        options(),
        &[("Duration", "5")],
        &[("Observe", "G1.Duration"), ("Area", "a1*2")],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert!(ctx.prepare_all(PrepareMode::Init));
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    assert_eq!(ctx.attribute(duration).unwrap().observers().len(), 1);

    ctx.configure(g2, "Area", "a1*3").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 15.0);
    assert_eq!(ctx.attribute(duration).unwrap().observers().len(), 1);
}

#[test]
fn test_cycle_reported_in_verbose_mode() {
    let config_1 = [("Observe", "G2.Duration"), ("Duration", "a1")];
    let config_2 = [("Observe", "G1.Duration"), ("Duration", "a1")];

    let (mut ctx, g1, _) = graph(options(), &config_1, &config_2);
    assert!(ctx.prepare_all(PrepareMode::Verbose));
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    let cycle = ctx.find_cycle(duration).unwrap();
    assert_eq!(cycle.len(), 3);
    assert_eq!(cycle.first(), cycle.last());
    assert!(ctx.diagnostics().count(Severity::Warning) >= 1);
    assert!(ctx
        .diagnostics()
        .iter()
        .all(|d| d.message.contains("dependency cycle")));

    let (mut ctx, _, _) = graph(options().with_cycle_warnings(false), &config_1, &config_2);
    assert!(ctx.prepare_all(PrepareMode::Verbose));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn test_acyclic_graph_has_no_cycle() {
    let (mut ctx, _, g2) = graph(
        options(),
        &[("Duration", "5")],
        &[("Observe", "G1.Duration"), ("Area", "a1*2")],
    );
    assert!(ctx.prepare_all(PrepareMode::Verbose));
    let area = ctx.find_attribute(g2, "Area").unwrap();
    assert_eq!(ctx.find_cycle(area), None);
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn test_depth_limit_cuts_divergent_cycle() {
    let (mut ctx, g1, _) = graph(
        options().with_cascade(CascadePolicy::DepthLimit(8)),
        &[("Observe", "G2.Duration"), ("Duration", "a1 + 1")],
        &[("Observe", "G1.Duration"), ("Duration", "a1 + 1")],
    );
    ctx.prepare_all(PrepareMode::Init);
    assert!(ctx.stats().truncated_cascades > 0);
    assert!(ctx.get::<f64>(g1, "Duration").unwrap().is_finite());
}

#[test]
fn test_update_recomputes_derived_parameters() {
    let mut ctx = SimContext::new(options());
    let g1 = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let params = ctx.add_module(None, "P", Parameters).unwrap();
    ctx.configure(g1, "Duration", "2").unwrap();
    ctx.configure(params, "Observe", "G1.Duration").unwrap();
    ctx.configure(params, "FOVx", "a1*100").unwrap();

    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(params, "Dx").unwrap(), 200.0 / 64.0);

    ctx.write(g1, "Duration", 3.0).unwrap();
    assert_eq!(ctx.get::<f64>(params, "FOVx").unwrap(), 300.0);
    assert_eq!(ctx.get::<f64>(params, "Dx").unwrap(), 300.0 / 64.0);
}

#[test]
fn test_update_reevaluates_bound_formulas() {
    let mut ctx = SimContext::new(options());
    let a = ctx.add_module(None, "A", AnalyticPulse).unwrap();
    ctx.configure(a, "Shape", "T").unwrap();
    let c = ctx.add_module(None, "C", GradientPulse).unwrap();
    ctx.configure(c, "Observe", "A.AnalyticTime").unwrap();
    ctx.configure(c, "Area", "a1*10").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));

    // The hot path sets the time without notifying.
    assert_eq!(AnalyticPulse::shape_at(&mut ctx, a, 4.0), Some(4.0));
    assert_eq!(ctx.get::<f64>(a, "AnalyticTime").unwrap(), 4.0);
    assert_eq!(ctx.get::<f64>(c, "Area").unwrap(), 0.0);

    assert!(ctx.prepare_all(PrepareMode::Update));
    assert_eq!(ctx.get::<f64>(c, "Area").unwrap(), 40.0);
}

#[test]
fn test_diff_request_rebinds_unchanged_config() {
    let (mut ctx, _, g2) = graph(
        options(),
        &[("Duration", "3")],
        &[("Observe", "G1.Duration"), ("Area", "a1*a1")],
    );
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 9.0);

    let area = ctx.find_attribute(g2, "Area").unwrap();
    ctx.set_diff(area, 1, "g1_duration").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 6.0);

    let binds = ctx.stats().binds;
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.stats().binds, binds);

    ctx.set_diff(area, 0, "").unwrap();
    assert!(ctx.prepare_all(PrepareMode::Init));
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 9.0);
}
