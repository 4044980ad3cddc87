//! Global imaging parameters and their derived k-space quantities.

use std::f64::consts::PI;

use crate::arena::ModuleId;
use crate::attribute::Visibility;
use crate::behavior::{ModuleBehavior, PrepareMode};
use crate::context::SimContext;
use crate::value::Value;

const AXES: [&str; 3] = ["x", "y", "z"];

/// Timing, field of view, matrix size and gradient limits.
///
/// `D<axis> = FOV/N`, `KMAX<axis> = Pi/D` and `DK<axis> = 2*KMAX/N` are
/// hidden and recomputed on every prepare, UPDATE included.
#[derive(Copy, Clone, Debug, Default)]
pub struct Parameters;

impl ModuleBehavior for Parameters {
    fn class_name(&self) -> &'static str {
        "Parameters"
    }

    fn declare(&self, ctx: &mut SimContext, module: ModuleId) {
        for name in ["TE", "TR", "TI", "TD"] {
            ctx.declare_attribute(module, name, Value::Double(0.0), Visibility::Public);
        }
        for (axis, fov, n) in [("x", 100.0, 64), ("y", 100.0, 64), ("z", 0.0, 1)] {
            ctx.declare_attribute(module, &format!("FOV{axis}"), Value::Double(fov), Visibility::Public);
            ctx.declare_attribute(module, &format!("N{axis}"), Value::Int(n), Visibility::Public);
        }
        ctx.declare_attribute(module, "GradSlewRate", Value::Double(1.0), Visibility::Public);
        ctx.declare_attribute(module, "GradMaxAmpl", Value::Double(1.0), Visibility::Public);
        for axis in AXES {
            for prefix in ["D", "KMAX", "DK"] {
                ctx.declare_attribute(module, &format!("{prefix}{axis}"), Value::Double(0.0), Visibility::Hidden);
            }
        }
    }

    fn prepare(&self, ctx: &mut SimContext, module: ModuleId, _mode: PrepareMode) -> bool {
        let mut ok = true;
        for axis in AXES {
            let (Ok(fov), Ok(n)) = (
                ctx.get::<f64>(module, &format!("FOV{axis}")),
                ctx.get::<i32>(module, &format!("N{axis}")),
            ) else {
                ok = false;
                continue;
            };
            let n = f64::from(n);
            let d = fov / n;
            let kmax = PI / d;
            let dk = 2.0 * kmax / n;
            ok &= ctx.write(module, &format!("D{axis}"), d).is_ok();
            ok &= ctx.write(module, &format!("KMAX{axis}"), kmax).is_ok();
            ok &= ctx.write(module, &format!("DK{axis}"), dk).is_ok();
        }
        ok
    }
}
