//! Pulses whose shape is a formula over time.

use crate::arena::{AttrId, ModuleId};
use crate::attribute::Visibility;
use crate::behavior::{ModuleBehavior, PrepareMode};
use crate::context::SimContext;
use crate::diagnostics::Severity;
use crate::module::ObserveCandidate;
use crate::value::{PulseAxis, Value};

/// A pulse with `Shape` over the hidden free attribute `AnalyticTime`
/// (placeholder `T`).
///
/// `Constants = "1.5, 2*Pi"` declares hidden `Constant1`, `Constant2`, ...
/// referenced as `c1`, `c2`, ... `Diff = n` binds the n-th time derivative
/// of `Shape`. With `n = 1` the configured shape is read as an
/// antiderivative: `AnalyticIntegral` receives `Shape(Duration) - Shape(0)`,
/// taken before the derivative replaces it.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnalyticPulse;

impl AnalyticPulse {
    /// Shape value at time `t`, through the native tier when available.
    pub fn shape_at(ctx: &mut SimContext, module: ModuleId, t: f64) -> Option<f64> {
        let shape = ctx.find_attribute(module, "Shape")?;
        Some(ctx.eval_compiled(shape, "AnalyticTime", t))
    }

    fn constants(ctx: &mut SimContext, module: ModuleId, list: &str, mode: PrepareMode) -> (Vec<ObserveCandidate>, bool) {
        let mut candidates = Vec::new();
        let mut ok = true;
        let items = list.split(',').map(str::trim).filter(|c| !c.is_empty());
        for (index, item) in items.enumerate() {
            let number = index + 1;
            let Some(constant) =
                ctx.declare_attribute(module, &format!("Constant{number}"), Value::Double(0.0), Visibility::Hidden)
            else {
                continue;
            };
            ok &= ctx.assign_literal(constant, item, mode);
            candidates.push(ObserveCandidate::new(constant, format!("c{number}")));
        }
        (candidates, ok)
    }

    fn integral(ctx: &mut SimContext, module: ModuleId, shape: AttrId) -> Option<f64> {
        let time = ctx.find_attribute(module, "AnalyticTime")?;
        let duration = ctx.get::<f64>(module, "Duration").ok()?;
        let end = Self::shape_with_time(ctx, shape, time, duration)?;
        let start = Self::shape_with_time(ctx, shape, time, 0.0)?;
        Some(end - start)
    }

    fn shape_with_time(ctx: &mut SimContext, shape: AttrId, time: AttrId, t: f64) -> Option<f64> {
        ctx.write_value(time, Value::Double(t)).ok()?;
        ctx.eval_expression(shape).ok()?;
        ctx.value_f64(shape)
    }
}

impl ModuleBehavior for AnalyticPulse {
    fn class_name(&self) -> &'static str {
        "AnalyticPulse"
    }

    fn is_sequence(&self) -> bool {
        true
    }

    fn handles(&self, key: &str) -> bool {
        matches!(key, "Shape" | "Constants" | "Diff")
    }

    fn declare(&self, ctx: &mut SimContext, module: ModuleId) {
        ctx.declare_attribute(module, "Axis", Value::Enum(PulseAxis::Void), Visibility::Public);
        ctx.declare_attribute(module, "Shape", Value::Double(0.0), Visibility::Public);
        ctx.declare_attribute(module, "AnalyticTime", Value::Double(0.0), Visibility::Hidden);
        ctx.declare_attribute(module, "AnalyticIntegral", Value::Double(0.0), Visibility::Hidden);
        ctx.declare_attribute(module, "Constants", Value::Str(String::new()), Visibility::Unobservable);
        ctx.declare_attribute(module, "Diff", Value::Int(0), Visibility::Unobservable);
    }

    fn prepare(&self, ctx: &mut SimContext, module: ModuleId, mode: PrepareMode) -> bool {
        if mode == PrepareMode::Update {
            return true;
        }
        let (Some(shape), Some(time)) = (
            ctx.find_attribute(module, "Shape"),
            ctx.find_attribute(module, "AnalyticTime"),
        ) else {
            return false;
        };
        let Some(text) = ctx.config_value(module, "Shape") else {
            ctx.reset_compiled_slots(shape);
            return true;
        };

        let mut ok = true;
        let mut candidates = ctx.observed(module);
        candidates.push(ObserveCandidate::new(time, "T"));
        if let Some(list) = ctx.config_value(module, "Constants") {
            let (constants, resolved) = Self::constants(ctx, module, &list, mode);
            candidates.extend(constants);
            ok &= resolved;
        }

        let order = match ctx.config_value(module, "Diff") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(order) => order,
                Err(_) => {
                    ctx.report(mode, Severity::Error, module, Some("Diff"), format!("`{raw}` is not a derivative order"));
                    return false;
                }
            },
            None => 0,
        };
        if let Some(diff) = ctx.find_attribute(module, "Diff") {
            ctx.assign(diff, Value::Int(i32::try_from(order).unwrap_or(i32::MAX)));
        }

        // The integral depends on Duration, so order 1 always re-binds.
        ok &= ctx.set_diff(shape, order, "AnalyticTime").is_ok();
        if order != 1 && ctx.config_unchanged(shape, &text, &candidates) {
            return ok & ctx.reevaluate_reported(shape, &text, mode);
        }

        ctx.reset_compiled_slots(shape);
        ok &= ctx.set_diff(shape, 0, "").is_ok();
        ok &= ctx.bind_reported(shape, &text, &candidates, mode);
        if ok && order > 0 {
            if order == 1 {
                match Self::integral(ctx, module, shape) {
                    Some(area) => {
                        if let Some(integral) = ctx.find_attribute(module, "AnalyticIntegral") {
                            ctx.assign(integral, Value::Double(area));
                        }
                    }
                    None => {
                        ctx.report(mode, Severity::Error, module, Some("Shape"), "cannot integrate the shape".to_owned());
                        ok = false;
                    }
                }
            }
            ok &= ctx.set_diff(shape, order, "AnalyticTime").is_ok();
            ok &= ctx.bind_reported(shape, &text, &candidates, mode);
        }
        ctx.record_source(shape, &text, &candidates, ok);
        ok
    }
}
