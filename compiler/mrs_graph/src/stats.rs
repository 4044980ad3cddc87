//! Engine counters.

use rustc_hash::FxHashMap;

use crate::arena::AttrId;

/// What the engine did since the context was created or last reset.
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    /// Values assigned to attributes.
    pub writes: u64,
    /// Writes whose value differed from the backup.
    pub state_changes: u64,
    /// Notify fan-outs started by a write outside any cascade.
    pub cascades: u64,
    /// Notify fan-outs at any depth.
    pub fanouts: u64,
    /// Cascades cut short by a depth limit.
    pub truncated_cascades: u64,
    /// Formulas parsed and linked to their subjects.
    pub binds: u64,
    /// Formula evaluations that produced a value.
    pub evaluations: u64,
    /// Evaluations skipped because a subject was NaN.
    pub skipped_nan: u64,
    /// Evaluations that failed (pole, unbound symbol).
    pub eval_errors: u64,
    /// Hot-path calls answered by native code.
    pub compiled_calls: u64,
    /// Hot-path calls answered by the interpreter.
    pub interpreted_calls: u64,
    pub(crate) notified: FxHashMap<AttrId, u64>,
}

impl EngineStats {
    /// How many times `attr` was notified of a subject change.
    pub fn notifications(&self, attr: AttrId) -> u64 {
        self.notified.get(&attr).copied().unwrap_or(0)
    }

    pub(crate) fn record_notification(&mut self, attr: AttrId) {
        *self.notified.entry(attr).or_default() += 1;
    }
}
