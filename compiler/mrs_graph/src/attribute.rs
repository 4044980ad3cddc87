//! Attributes: typed, named properties owned by a module.

use bitflags::bitflags;
use mrs_formula::{Bindings, Formula, SymbolId};
use mrs_native::CompiledFunction;
use smallvec::SmallVec;

use crate::arena::{AttrId, ModuleId};
use crate::module::ObserveCandidate;
use crate::value::{Value, ValueKind};

bitflags! {
    /// Visibility of an attribute.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct AttrFlags: u8 {
        /// Listed as a user-facing property of the module.
        const PUBLIC = 1 << 0;
        /// May be a formula subject; writes notify observers.
        const OBSERVABLE = 1 << 1;
    }
}

/// How a module declares an attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Public and observable.
    Public,
    /// Observable but not public.
    Hidden,
    /// Neither; no change detection.
    Unobservable,
}

impl Visibility {
    pub fn flags(self) -> AttrFlags {
        match self {
            Visibility::Public => AttrFlags::PUBLIC | AttrFlags::OBSERVABLE,
            Visibility::Hidden => AttrFlags::OBSERVABLE,
            Visibility::Unobservable => AttrFlags::empty(),
        }
    }
}

/// A parsed formula together with the symbol of each subject.
#[derive(Clone, Debug)]
pub(crate) struct BoundExpr {
    pub(crate) expression: Formula,
    /// Parallel to `Attribute::subjects`; `None` when the subject's symbol
    /// vanished from the expression (folded away or differentiated out).
    pub(crate) symbols: SmallVec<[Option<SymbolId>; 4]>,
    pub(crate) bindings: Bindings,
    pub(crate) uses_vector: bool,
}

/// Pending request to bind the n-th derivative instead of the formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DiffRequest {
    pub(crate) order: u32,
    /// Attribute name on the same module, or a raw symbol.
    pub(crate) variable: String,
}

/// The configuration text an attribute was last bound from.
#[derive(Clone, Debug)]
pub(crate) struct ConfigSource {
    pub(crate) text: String,
    pub(crate) candidates: Vec<ObserveCandidate>,
    /// Derivative request in force when the text was bound.
    pub(crate) diff: Option<DiffRequest>,
    pub(crate) ok: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum CompileSlot {
    Pending,
    Ready(CompiledFunction),
    Failed,
}

/// Specializations of one attribute's formula, one per slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct CompileSlots {
    pub(crate) slots: Vec<CompileSlot>,
    pub(crate) current: usize,
}

impl CompileSlots {
    /// Move to the next slot, stopping one past the last.
    pub(crate) fn step(&mut self) {
        if !self.slots.is_empty() {
            self.current = (self.current + 1).min(self.slots.len());
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.current = 0;
    }
}

/// One property of a module.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub(crate) name: String,
    pub(crate) module: ModuleId,
    pub(crate) flags: AttrFlags,
    pub(crate) value: Value,
    /// Last value seen by change detection; `None` when unobservable.
    pub(crate) backup: Option<Value>,
    /// Empty for literals.
    pub(crate) formula: String,
    pub(crate) bound: Option<BoundExpr>,
    pub(crate) subjects: SmallVec<[AttrId; 4]>,
    pub(crate) observers: SmallVec<[AttrId; 4]>,
    pub(crate) diff: Option<DiffRequest>,
    pub(crate) complex: bool,
    pub(crate) imaginary: f64,
    pub(crate) slots: CompileSlots,
    pub(crate) source: Option<ConfigSource>,
}

impl Attribute {
    pub(crate) fn new(name: &str, module: ModuleId, value: Value, flags: AttrFlags) -> Self {
        let backup = flags
            .contains(AttrFlags::OBSERVABLE)
            .then(|| value.clone());
        Attribute {
            name: name.to_owned(),
            module,
            flags,
            value,
            backup,
            formula: String::new(),
            bound: None,
            subjects: SmallVec::new(),
            observers: SmallVec::new(),
            diff: None,
            complex: false,
            imaginary: 0.0,
            slots: CompileSlots::default(),
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub fn flags(&self) -> AttrFlags {
        self.flags
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(AttrFlags::PUBLIC)
    }

    pub fn is_observable(&self) -> bool {
        self.flags.contains(AttrFlags::OBSERVABLE)
    }

    /// Bound formula text after placeholder substitution, if any.
    pub fn formula(&self) -> Option<&str> {
        (!self.formula.is_empty()).then_some(self.formula.as_str())
    }

    pub fn has_formula(&self) -> bool {
        !self.formula.is_empty()
    }

    pub fn expression(&self) -> Option<&Formula> {
        self.bound.as_ref().map(|bound| &bound.expression)
    }

    pub fn subjects(&self) -> &[AttrId] {
        &self.subjects
    }

    pub fn observers(&self) -> &[AttrId] {
        &self.observers
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Imaginary part of the last evaluation.
    pub fn imaginary(&self) -> f64 {
        self.imaginary
    }

    /// Number of native specializations held.
    pub fn compile_slots(&self) -> usize {
        self.slots.slots.len()
    }

    pub(crate) fn set_observable(&mut self, observable: bool) {
        self.flags.set(AttrFlags::OBSERVABLE, observable);
        self.backup = observable.then(|| self.value.clone());
    }
}
