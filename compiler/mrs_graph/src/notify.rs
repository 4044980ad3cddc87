//! Writes and change propagation.
//!
//! A write that changes an observable value notifies every observer: each
//! one is re-evaluated and its module re-prepared in UPDATE mode, depth
//! first. Recursion stops where [`SimContext::new_state`] sees no change.

use mrs_formula::ensure_sufficient_stack;
use tracing::{debug, warn};

use crate::arena::AttrId;
use crate::behavior::PrepareMode;
use crate::context::SimContext;
use crate::error::AttrError;
use crate::options::CascadePolicy;
use crate::value::Value;

impl SimContext {
    /// Assign `value` to `attr` and notify observers if it changed.
    ///
    /// The value must be of the attribute's kind.
    pub fn write_value(&mut self, attr: AttrId, value: Value) -> Result<bool, AttrError> {
        let attribute = self.attrs.get(attr).ok_or(AttrError::StaleAttribute(attr))?;
        if attribute.value.kind() != value.kind() {
            return Err(AttrError::TypeMismatch {
                name: attribute.name.clone(),
                expected: attribute.value.kind(),
                found: value.kind(),
            });
        }
        Ok(self.assign(attr, value))
    }

    /// Whether `candidate` differs from the last value seen by `attr`.
    ///
    /// Updates the backup. Unobservable attributes never report a change.
    pub fn new_state(&mut self, attr: AttrId, candidate: &Value) -> bool {
        let Some(attribute) = self.attrs.get_mut(attr) else {
            return false;
        };
        match &mut attribute.backup {
            Some(backup) if backup.same_state(candidate) => false,
            Some(backup) => {
                backup.clone_from(candidate);
                true
            }
            None => false,
        }
    }

    pub(crate) fn assign(&mut self, attr: AttrId, value: Value) -> bool {
        let changed = self.new_state(attr, &value);
        let Some(attribute) = self.attrs.get_mut(attr) else {
            return false;
        };
        attribute.value = value;
        self.stats.writes += 1;
        if changed {
            self.stats.state_changes += 1;
            self.notify(attr);
        }
        changed
    }

    /// Re-evaluate every observer of `attr`, then re-prepare its module.
    #[tracing::instrument(level = "trace", skip_all, fields(attr = ?attr, depth = self.cascade_depth))]
    pub fn notify(&mut self, attr: AttrId) {
        if let CascadePolicy::DepthLimit(limit) = self.options.cascade {
            if self.cascade_depth >= limit {
                self.stats.truncated_cascades += 1;
                warn!(
                    attr = %self.qualified_name(attr),
                    limit,
                    "cascade depth limit reached, not notifying further"
                );
                return;
            }
        }
        let Some(observers) = self.attrs.get(attr).map(|a| a.observers.clone()) else {
            return;
        };
        if self.cascade_depth == 0 {
            self.stats.cascades += 1;
        }
        self.stats.fanouts += 1;

        self.cascade_depth += 1;
        for observer in observers {
            ensure_sufficient_stack(|| self.notify_observer(observer));
        }
        self.cascade_depth -= 1;
    }

    fn notify_observer(&mut self, observer: AttrId) {
        let Some(attribute) = self.attrs.get_mut(observer) else {
            return;
        };
        attribute.slots.step();
        let module = attribute.module;
        self.stats.record_notification(observer);

        if let Err(err) = self.eval_expression(observer) {
            debug!(attr = %self.qualified_name(observer), %err, "observer kept its value");
        }
        self.reevaluate_module(module, Some(observer));
        if let Some(behavior) = self.behavior(module) {
            behavior.prepare(self, module, PrepareMode::Update);
        }
    }
}
