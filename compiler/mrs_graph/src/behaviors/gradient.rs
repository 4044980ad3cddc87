//! Gradient pulses with optional non-linear field and eddy-current kernels.

use crate::arena::ModuleId;
use crate::attribute::Visibility;
use crate::behavior::{ModuleBehavior, PrepareMode};
use crate::compiled::NLG_ATTRIBUTES;
use crate::context::SimContext;
use crate::module::ObserveCandidate;
use crate::value::{PulseAxis, Value};

/// Placeholders of the four NLG free attributes, in [`NLG_ATTRIBUTES`] order.
const NLG_PLACEHOLDERS: [&str; 4] = ["X", "Y", "Z", "G"];

/// A gradient pulse.
///
/// `NLG_field` is a formula over the position `X`, `Y`, `Z` and the nominal
/// gradient value `G`; `EddyCurrents` is a kernel over the time `T`. Both
/// are evaluated on the hot path.
#[derive(Copy, Clone, Debug, Default)]
pub struct GradientPulse;

impl GradientPulse {
    /// Actual field at `(x, y, z)` for nominal gradient value `g`.
    pub fn nlg_field(ctx: &mut SimContext, module: ModuleId, position: [f64; 4]) -> Option<f64> {
        let field = ctx.find_attribute(module, "NLG_field")?;
        if !ctx.attribute(field)?.has_formula() {
            return None;
        }
        Some(ctx.eval_compiled_nlg(field, position))
    }

    /// Eddy-current kernel at time `t`.
    pub fn eddy_current(ctx: &mut SimContext, module: ModuleId, t: f64) -> Option<f64> {
        let kernel = ctx.find_attribute(module, "EddyCurrents")?;
        if !ctx.attribute(kernel)?.has_formula() {
            return None;
        }
        Some(ctx.eval_compiled(kernel, "EddyTime", t))
    }
}

impl ModuleBehavior for GradientPulse {
    fn class_name(&self) -> &'static str {
        "GradientPulse"
    }

    fn is_sequence(&self) -> bool {
        true
    }

    fn handles(&self, key: &str) -> bool {
        matches!(key, "NLG_field" | "EddyCurrents")
    }

    fn declare(&self, ctx: &mut SimContext, module: ModuleId) {
        ctx.declare_attribute(module, "Axis", Value::Enum(PulseAxis::Void), Visibility::Public);
        for name in ["Area", "SlewRate", "MaxAmpl", "NLG_field", "EddyCurrents"] {
            ctx.declare_attribute(module, name, Value::Double(0.0), Visibility::Public);
        }
        for name in NLG_ATTRIBUTES.iter().chain(&["EddyTime"]) {
            ctx.declare_attribute(module, name, Value::Double(0.0), Visibility::Hidden);
        }
    }

    fn prepare(&self, ctx: &mut SimContext, module: ModuleId, mode: PrepareMode) -> bool {
        if mode == PrepareMode::Update {
            return true;
        }
        let observed = ctx.observed(module);
        let mut ok = true;

        if let (Some(text), Some(field)) = (
            ctx.config_value(module, "NLG_field"),
            ctx.find_attribute(module, "NLG_field"),
        ) {
            let mut candidates = observed.clone();
            for (name, placeholder) in NLG_ATTRIBUTES.iter().zip(NLG_PLACEHOLDERS) {
                if let Some(free) = ctx.find_attribute(module, name) {
                    candidates.push(ObserveCandidate::new(free, placeholder));
                }
            }
            ok &= ctx.bind_config(field, &text, &candidates, mode);
            ctx.reset_compiled_slots(field);
        }

        if let (Some(text), Some(kernel), Some(time)) = (
            ctx.config_value(module, "EddyCurrents"),
            ctx.find_attribute(module, "EddyCurrents"),
            ctx.find_attribute(module, "EddyTime"),
        ) {
            let mut candidates = observed;
            candidates.push(ObserveCandidate::new(time, "T"));
            ok &= ctx.bind_config(kernel, &text, &candidates, mode);
            ctx.reset_compiled_slots(kernel);
        }
        ok
    }
}
