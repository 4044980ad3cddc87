//! `demo`: two gradients and an analytic pulse following `G1.Duration`.

use mrs_graph::behaviors::{AnalyticPulse, GradientPulse, Sequence};
use mrs_graph::{AttrError, EngineOptions, ModuleId, PrepareMode, SimContext};

use super::fail;

/// `Seq` holding `G1`, `G2` and `RF`.
fn add_modules(ctx: &mut SimContext) -> Result<(ModuleId, ModuleId, ModuleId), AttrError> {
    let root = ctx.add_module(None, "Seq", Sequence)?;
    let g1 = ctx.add_module(Some(root), "G1", GradientPulse)?;
    let g2 = ctx.add_module(Some(root), "G2", GradientPulse)?;
    let rf = ctx.add_module(Some(root), "RF", AnalyticPulse)?;
    Ok((g1, g2, rf))
}

fn configure(ctx: &mut SimContext, module: ModuleId, entries: &[(&str, &str)]) {
    for (key, text) in entries {
        if let Err(err) = ctx.configure(module, key, text) {
            fail(err);
        }
    }
}

fn show(ctx: &SimContext, module: ModuleId, name: &str) {
    let Some(attr) = ctx.find_attribute(module, name) else {
        println!("  no attribute {name}");
        return;
    };
    if let Some(value) = ctx.value(attr) {
        println!("  {:<16} = {value}", ctx.qualified_name(attr));
    }
}

pub fn demo() {
    let mut ctx = SimContext::new(EngineOptions::from_env());
    let (g1, g2, rf) = add_modules(&mut ctx).unwrap_or_else(|err| fail(err));

    configure(&mut ctx, g1, &[("Duration", "5")]);
    configure(
        &mut ctx,
        g2,
        &[("Observe", "G1.Duration"), ("Area", "a1*2")],
    );
    configure(
        &mut ctx,
        rf,
        &[
            ("Observe", "G1.Duration"),
            ("Duration", "a1"),
            ("Constants", "0.5"),
            ("Shape", "c1*sin(Pi*T/a1)"),
        ],
    );

    let ok = ctx.prepare_all(PrepareMode::Verbose);
    for diagnostic in ctx.take_diagnostics() {
        println!("{diagnostic}");
    }
    println!("prepared: {}", if ok { "ok" } else { "with errors" });
    show(&ctx, g1, "Duration");
    show(&ctx, g2, "Area");
    show(&ctx, rf, "Duration");

    ctx.reset_stats();
    if let Err(err) = ctx.write(g1, "Duration", 7.0) {
        fail(err);
    }
    println!("after G1.Duration = 7:");
    show(&ctx, g1, "Duration");
    show(&ctx, g2, "Area");
    show(&ctx, rf, "Duration");
    let stats = ctx.stats();
    println!(
        "  {} cascade(s), {} evaluation(s), {} state change(s)",
        stats.cascades, stats.evaluations, stats.state_changes
    );

    println!("RF shape over [0, 7] via {}:", ctx.native_backend());
    for i in 0..=7 {
        let t = f64::from(i);
        if let Some(value) = AnalyticPulse::shape_at(&mut ctx, rf, t) {
            println!("  T = {t:<4} {value:.6}");
        }
    }
    for diagnostic in ctx.take_diagnostics() {
        println!("{diagnostic}");
    }
}
