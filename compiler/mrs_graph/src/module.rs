//! Modules: tree nodes owning a set of attributes.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::arena::{AttrId, ModuleId};
use crate::behavior::ModuleBehavior;

/// A subject offered to the binder and the token that stands for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObserveCandidate {
    pub subject: AttrId,
    pub placeholder: String,
}

impl ObserveCandidate {
    pub fn new(subject: AttrId, placeholder: impl Into<String>) -> Self {
        ObserveCandidate {
            subject,
            placeholder: placeholder.into(),
        }
    }
}

pub struct Module {
    pub(crate) name: String,
    pub(crate) parent: Option<ModuleId>,
    pub(crate) children: Vec<ModuleId>,
    pub(crate) attributes: FxHashMap<String, AttrId>,
    /// Declaration order.
    pub(crate) order: Vec<AttrId>,
    /// Raw `(key, text)` pairs in the order they were first configured.
    pub(crate) config: Vec<(String, String)>,
    pub(crate) observed: Vec<ObserveCandidate>,
    pub(crate) vector: Vec<f64>,
    pub(crate) prepared: bool,
    pub(crate) behavior: Rc<dyn ModuleBehavior>,
}

impl Module {
    pub(crate) fn new(name: &str, parent: Option<ModuleId>, behavior: Rc<dyn ModuleBehavior>) -> Self {
        Module {
            name: name.to_owned(),
            parent,
            children: Vec::new(),
            attributes: FxHashMap::default(),
            order: Vec::new(),
            config: Vec::new(),
            observed: Vec::new(),
            vector: Vec::new(),
            prepared: false,
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &'static str {
        self.behavior.class_name()
    }

    pub fn parent(&self) -> Option<ModuleId> {
        self.parent
    }

    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<AttrId> {
        self.attributes.get(name).copied()
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[AttrId] {
        &self.order
    }

    pub fn config(&self, key: &str) -> Option<&str> {
        self.config
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Subjects resolved from `Observe` on the last INIT pass.
    pub fn observed(&self) -> &[ObserveCandidate] {
        &self.observed
    }

    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn set_config(&mut self, key: &str, text: &str) {
        match self.config.iter_mut().find(|(k, _)| k == key) {
            Some((_, value)) => text.clone_into(value),
            None => self.config.push((key.to_owned(), text.to_owned())),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("class", &self.class_name())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("attributes", &self.order.len())
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}
