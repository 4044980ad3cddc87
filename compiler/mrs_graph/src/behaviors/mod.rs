//! Module classes.
//!
//! Each behavior decides which attributes its modules have and binds the
//! ones that need more than the generic `Observe` candidates.

mod analytic;
mod gradient;
mod parameters;

pub use analytic::AnalyticPulse;
pub use gradient::GradientPulse;
pub use parameters::Parameters;

use crate::behavior::ModuleBehavior;

/// A module with nothing beyond `Name`, `Observe` and `Vector`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Generic;

impl ModuleBehavior for Generic {
    fn class_name(&self) -> &'static str {
        "Generic"
    }
}

/// A timed container; adds `Duration`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sequence;

impl ModuleBehavior for Sequence {
    fn class_name(&self) -> &'static str {
        "Sequence"
    }

    fn is_sequence(&self) -> bool {
        true
    }
}
