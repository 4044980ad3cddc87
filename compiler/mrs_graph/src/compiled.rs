//! Hot-path evaluation through the native tier.
//!
//! Formulas evaluated inside the per-spin loop have one free attribute
//! (a time) or four (the spatial position and gradient value). Each call
//! either runs the native specialization for the attribute's current slot,
//! compiling it on first use, or writes the free values into the free
//! attributes and interprets.
//!
//! Calls whose non-free subjects are NaN, and native results that are not
//! finite, go through the interpreter so both tiers agree on skipped
//! evaluations and poles.
//!
//! The first compile failure is reported once; after that every formula in
//! the context is interpreted.

use mrs_formula::{to_c, Bindings};
use mrs_native::{NativeBackend, NativeError};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::arena::AttrId;
use crate::attribute::CompileSlot;
use crate::context::SimContext;
use crate::diagnostics::{Diagnostic, Severity};
use crate::options::EvalStrategy;
use crate::value::Value;

/// Names of the free attributes of a non-linear gradient field.
pub const NLG_ATTRIBUTES: [&str; 4] = ["NLG_posX", "NLG_posY", "NLG_posZ", "NLG_value"];

pub(crate) struct NativeTier {
    pub(crate) backend: Box<dyn NativeBackend>,
    /// Set by the first failure; routes every later call to the interpreter.
    pub(crate) fallback: bool,
}

impl NativeTier {
    pub(crate) fn new(backend: Box<dyn NativeBackend>) -> Self {
        NativeTier {
            backend,
            fallback: false,
        }
    }
}

enum SlotState {
    Interpret,
    Compile(usize),
    Call(usize),
}

impl SimContext {
    /// Value of `attr` with its attribute `free` set to `x`.
    pub fn eval_compiled(&mut self, attr: AttrId, free: &str, x: f64) -> f64 {
        let Some(free) = self
            .attrs
            .get(attr)
            .and_then(|a| self.find_attribute(a.module, free))
        else {
            debug!(attr = %self.qualified_name(attr), free, "no such free attribute");
            return self.value_f64(attr).unwrap_or(f64::NAN);
        };
        self.eval_hot(attr, &[free], &[x])
    }

    /// Value of `attr` at position `x, y, z` with gradient value `g`.
    pub fn eval_compiled_nlg(&mut self, attr: AttrId, args: [f64; 4]) -> f64 {
        let Some(module) = self.attrs.get(attr).map(|a| a.module) else {
            return f64::NAN;
        };
        let free: Option<SmallVec<[AttrId; 4]>> = NLG_ATTRIBUTES
            .iter()
            .map(|name| self.find_attribute(module, name))
            .collect();
        let Some(free) = free else {
            debug!(attr = %self.qualified_name(attr), "module has no NLG attributes");
            return self.value_f64(attr).unwrap_or(f64::NAN);
        };
        self.eval_hot(attr, &free, &args)
    }

    /// Go back to the first specialization.
    pub fn reset_compiled_slots(&mut self, attr: AttrId) {
        if let Some(attribute) = self.attrs.get_mut(attr) {
            attribute.slots.reset();
        }
    }

    /// Whether native compilation has been given up on.
    pub fn native_fallback_active(&self) -> bool {
        self.native.fallback
    }

    pub fn native_backend(&self) -> String {
        self.native.backend.describe()
    }

    fn eval_hot(&mut self, attr: AttrId, free: &[AttrId], args: &[f64]) -> f64 {
        match self.slot_state(attr, free) {
            SlotState::Interpret => self.eval_interpreted(attr, free, args),
            SlotState::Compile(index) => match self.compile_slot(attr, free, index) {
                Ok(()) => self.call_slot(attr, index, free, args),
                Err(err) => {
                    self.give_up_native(attr, index, &err);
                    self.eval_interpreted(attr, free, args)
                }
            },
            SlotState::Call(index) => self.call_slot(attr, index, free, args),
        }
    }

    fn slot_state(&mut self, attr: AttrId, free: &[AttrId]) -> SlotState {
        if self.options.strategy == EvalStrategy::Interpreted
            || self.native.fallback
            || self.has_nan_subject(attr, free)
        {
            return SlotState::Interpret;
        }
        let max_slots = self.options.max_compile_slots;
        let Some(attribute) = self.attrs.get_mut(attr) else {
            return SlotState::Interpret;
        };
        if attribute.bound.is_none() {
            return SlotState::Interpret;
        }
        let slots = &mut attribute.slots;
        if slots.current == slots.slots.len() {
            if slots.slots.len() >= max_slots {
                return SlotState::Interpret;
            }
            slots.slots.push(CompileSlot::Pending);
        }
        match slots.slots[slots.current] {
            CompileSlot::Pending => SlotState::Compile(slots.current),
            CompileSlot::Ready(_) => SlotState::Call(slots.current),
            CompileSlot::Failed => SlotState::Interpret,
        }
    }

    fn has_nan_subject(&self, attr: AttrId, free: &[AttrId]) -> bool {
        self.attrs.get(attr).is_some_and(|attribute| {
            attribute
                .subjects
                .iter()
                .filter(|subject| !free.contains(*subject))
                .any(|subject| self.value_f64(*subject).is_none_or(f64::is_nan))
        })
    }

    /// Specialize to the current values of every non-free subject and
    /// compile.
    fn compile_slot(&mut self, attr: AttrId, free: &[AttrId], index: usize) -> Result<(), NativeError> {
        let Some(attribute) = self.attrs.get(attr) else {
            return Err(NativeError::Disabled);
        };
        let Some(bound) = &attribute.bound else {
            return Err(NativeError::Disabled);
        };

        let mut bindings = Bindings::for_formula(&bound.expression);
        for (subject, symbol) in attribute.subjects.iter().zip(&bound.symbols) {
            if free.contains(subject) {
                continue;
            }
            if let (Some(symbol), Some(value)) = (symbol, self.value_f64(*subject)) {
                bindings.set(*symbol, value);
            }
        }
        let vector = self
            .modules
            .get(attribute.module)
            .map(|m| m.vector.clone())
            .unwrap_or_default();
        bindings.set_vector(&vector);

        let mut specialized = bound.expression.specialize(&bindings);
        let names: SmallVec<[String; 4]> = free.iter().filter_map(|f| self.symbol_of(*f)).collect();
        let params: SmallVec<[_; 4]> = names.iter().map(|name| specialized.intern_symbol(name)).collect();
        let source = to_c(&specialized, &params, &vector)?;
        debug!(attr = %self.qualified_name(attr), slot = index, formula = %specialized, "compiling specialization");

        let function = self.native.backend.compile(&source)?;
        if let Some(slot) = self
            .attrs
            .get_mut(attr)
            .and_then(|a| a.slots.slots.get_mut(index))
        {
            *slot = CompileSlot::Ready(function);
        }
        Ok(())
    }

    fn call_slot(&mut self, attr: AttrId, index: usize, free: &[AttrId], args: &[f64]) -> f64 {
        let result = self.attrs.get_mut(attr).and_then(|attribute| {
            let CompileSlot::Ready(function) = attribute.slots.slots.get(index)? else {
                return None;
            };
            let real = function.call(args)?;
            if attribute.complex {
                attribute.imaginary = function.call_imag(args).unwrap_or(0.0);
            }
            Some(real)
        });
        match result {
            Some(value) if value.is_finite() => {
                self.stats.compiled_calls += 1;
                value
            }
            _ => self.eval_interpreted(attr, free, args),
        }
    }

    fn give_up_native(&mut self, attr: AttrId, index: usize, err: &NativeError) {
        if let Some(slot) = self
            .attrs
            .get_mut(attr)
            .and_then(|a| a.slots.slots.get_mut(index))
        {
            *slot = CompileSlot::Failed;
        }
        if self.native.fallback {
            return;
        }
        self.native.fallback = true;

        let name = self.qualified_name(attr);
        let backend = self.native.backend.describe();
        warn!(
            attribute = %name,
            %backend,
            "native compilation failed, interpreting every formula from now on: {err}"
        );
        let (module, attribute) = name.split_once('.').unwrap_or((name.as_str(), ""));
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            module: module.to_owned(),
            attribute: Some(attribute.to_owned()).filter(|a| !a.is_empty()),
            message: format!(
                "native compilation with {backend} failed, falling back to the interpreter: {err}"
            ),
        });
    }

    /// Write the free values silently and evaluate.
    fn eval_interpreted(&mut self, attr: AttrId, free: &[AttrId], args: &[f64]) -> f64 {
        self.stats.interpreted_calls += 1;
        for (free, x) in free.iter().zip(args) {
            if let Some(attribute) = self.attrs.get_mut(*free) {
                let value = Value::from_f64(attribute.value.kind(), *x);
                if let Some(backup) = attribute.backup.as_mut() {
                    backup.clone_from(&value);
                }
                attribute.value = value;
            }
        }
        if let Err(err) = self.eval_expression(attr) {
            debug!(attr = %self.qualified_name(attr), %err, "hot-path evaluation failed");
        }
        self.value_f64(attr).unwrap_or(f64::NAN)
    }
}
