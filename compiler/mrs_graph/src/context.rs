//! The simulation context: every module and attribute of one process.
//!
//! Holds what used to be process globals (module tree, native tier, fallback
//! flag) so independent trees can live side by side, one per test.

use std::rc::Rc;

use mrs_native::{DisabledBackend, NativeBackend, NativeCompiler};
use tracing::{debug, warn};

use crate::arena::{Arena, AttrId, ModuleId};
use crate::attribute::{AttrFlags, Attribute, DiffRequest, Visibility};
use crate::behavior::{ModuleBehavior, PrepareMode};
use crate::compiled::NativeTier;
use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::error::AttrError;
use crate::module::{Module, ObserveCandidate};
use crate::options::{EngineOptions, EvalStrategy};
use crate::stats::EngineStats;
use crate::value::{AttrValue, Value};

pub struct SimContext {
    pub(crate) modules: Arena<ModuleId, Module>,
    pub(crate) attrs: Arena<AttrId, Attribute>,
    pub(crate) roots: Vec<ModuleId>,
    pub(crate) options: EngineOptions,
    pub(crate) native: NativeTier,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) stats: EngineStats,
    pub(crate) cascade_depth: usize,
}

impl SimContext {
    /// A context whose native tier follows `options`.
    pub fn new(options: EngineOptions) -> Self {
        let backend: Box<dyn NativeBackend> = match options.strategy {
            EvalStrategy::Native => {
                let compiler = NativeCompiler::new(options.compiler.clone());
                match &options.scratch_dir {
                    Some(dir) => Box::new(compiler.with_scratch_dir(dir)),
                    None => Box::new(compiler),
                }
            }
            EvalStrategy::Interpreted => Box::new(DisabledBackend),
        };
        Self::with_backend(options, backend)
    }

    /// A context with an explicit native backend.
    pub fn with_backend(options: EngineOptions, backend: Box<dyn NativeBackend>) -> Self {
        debug!(backend = %backend.describe(), strategy = ?options.strategy, "new simulation context");
        SimContext {
            modules: Arena::new(),
            attrs: Arena::new(),
            roots: Vec::new(),
            options,
            native: NativeTier::new(backend),
            diagnostics: Diagnostics::default(),
            stats: EngineStats::default(),
            cascade_depth: 0,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EngineStats::default();
    }

    // Tree

    /// Create a module under `parent` (or as a root) and declare its
    /// attributes.
    pub fn add_module<B>(
        &mut self,
        parent: Option<ModuleId>,
        name: &str,
        behavior: B,
    ) -> Result<ModuleId, AttrError>
    where
        B: ModuleBehavior + 'static,
    {
        if let Some(parent) = parent {
            if !self.modules.contains(parent) {
                return Err(AttrError::UnknownModule(parent));
            }
        }
        let behavior: Rc<dyn ModuleBehavior> = Rc::new(behavior);
        let id = self
            .modules
            .insert(Module::new(name, parent, Rc::clone(&behavior)));
        match parent.and_then(|p| self.modules.get_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        self.declare_all(id, &*behavior);
        debug!(module = name, class = behavior.class_name(), id = ?id, "added module");
        Ok(id)
    }

    /// Destroy `id`, its descendants and their attributes.
    ///
    /// Every subject/observer edge touching a destroyed attribute is removed
    /// from the surviving side; observers keep their formula and fail to
    /// evaluate until re-bound.
    pub fn remove_module(&mut self, id: ModuleId) -> bool {
        let Some(module) = self.modules.get(id) else {
            return false;
        };
        match module.parent.and_then(|p| self.modules.get_mut(p)) {
            Some(parent) => parent.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut doomed = vec![id];
        let mut index = 0;
        while index < doomed.len() {
            if let Some(module) = self.modules.get(doomed[index]) {
                doomed.extend_from_slice(&module.children);
            }
            index += 1;
        }

        for module_id in &doomed {
            let Some(module) = self.modules.remove(*module_id) else {
                continue;
            };
            for attr in module.order {
                self.destroy_attribute(attr);
            }
            debug!(module = %module.name, "removed module");
        }

        let removed = |attr: AttrId| !self.attrs.contains(attr);
        let stale: Vec<ModuleId> = self
            .modules
            .iter()
            .filter(|(_, m)| m.observed.iter().any(|c| removed(c.subject)))
            .map(|(id, _)| id)
            .collect();
        for module_id in stale {
            if let Some(module) = self.modules.get_mut(module_id) {
                module.observed.retain(|c| self.attrs.contains(c.subject));
            }
        }
        true
    }

    fn destroy_attribute(&mut self, attr: AttrId) {
        let Some(removed) = self.attrs.remove(attr) else {
            return;
        };
        for subject in &removed.subjects {
            if let Some(subject) = self.attrs.get_mut(*subject) {
                subject.observers.retain(|o| *o != attr);
            }
        }
        for observer in &removed.observers {
            let Some(observer) = self.attrs.get_mut(*observer) else {
                continue;
            };
            observer.source = None;
            let Some(index) = observer.subjects.iter().position(|s| *s == attr) else {
                continue;
            };
            observer.subjects.remove(index);
            if let Some(bound) = observer.bound.as_mut() {
                if index < bound.symbols.len() {
                    if let Some(symbol) = bound.symbols.remove(index) {
                        bound.bindings.unset(symbol);
                    }
                }
            }
        }
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn attribute(&self, id: AttrId) -> Option<&Attribute> {
        self.attrs.get(id)
    }

    /// Every live module, in creation order of their slots.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter()
    }

    pub fn roots(&self) -> &[ModuleId] {
        &self.roots
    }

    pub fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.modules.get(id).and_then(|m| m.parent)
    }

    pub fn children(&self, id: ModuleId) -> &[ModuleId] {
        self.modules.get(id).map_or(&[], |m| m.children.as_slice())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    /// First module named `name`, anywhere in the context.
    pub fn find_module(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    pub fn find_attribute(&self, module: ModuleId, name: &str) -> Option<AttrId> {
        self.modules.get(module).and_then(|m| m.attribute(name))
    }

    /// `Module.Attribute` lookup by names.
    pub fn lookup(&self, module: &str, attribute: &str) -> Option<AttrId> {
        self.find_attribute(self.find_module(module)?, attribute)
    }

    /// Set a raw configuration value for the next INIT pass.
    pub fn configure(&mut self, module: ModuleId, key: &str, text: &str) -> Result<(), AttrError> {
        self.modules
            .get_mut(module)
            .ok_or(AttrError::UnknownModule(module))?
            .set_config(key, text);
        Ok(())
    }

    // Declaration

    /// Create `name` on `module` unless it exists; returns its handle either way.
    pub fn declare_attribute(
        &mut self,
        module: ModuleId,
        name: &str,
        value: Value,
        visibility: Visibility,
    ) -> Option<AttrId> {
        let existing = self.modules.get(module)?.attribute(name);
        if existing.is_some() {
            return existing;
        }
        let id = self
            .attrs
            .insert(Attribute::new(name, module, value, visibility.flags()));
        let owner = self.modules.get_mut(module)?;
        owner.attributes.insert(name.to_owned(), id);
        owner.order.push(id);
        Some(id)
    }

    pub(crate) fn declare_all(&mut self, module: ModuleId, behavior: &dyn ModuleBehavior) {
        let name = self
            .modules
            .get(module)
            .map(|m| m.name.clone())
            .unwrap_or_default();
        self.declare_attribute(module, "Name", Value::Str(name), Visibility::Public);
        self.declare_attribute(module, "Observe", Value::Str(String::new()), Visibility::Unobservable);
        self.declare_attribute(module, "Vector", Value::Str(String::new()), Visibility::Unobservable);
        if behavior.is_sequence() {
            self.declare_attribute(module, "Duration", Value::Double(0.0), Visibility::Public);
        }
        behavior.declare(self, module);
    }

    /// Make an attribute non-public and set its observability.
    pub fn hide_attribute(&mut self, module: ModuleId, name: &str, observable: bool) -> Result<(), AttrError> {
        let id = self.resolve(module, name)?;
        let attr = self.attrs.get_mut(id).ok_or(AttrError::StaleAttribute(id))?;
        attr.flags.remove(AttrFlags::PUBLIC);
        attr.set_observable(observable);
        Ok(())
    }

    /// Bind the `order`-th derivative with respect to `variable` on the next
    /// bind; configured attributes are re-bound on the next INIT pass.
    /// `variable` names an attribute of the same module or a raw symbol;
    /// order 0 cancels the request.
    pub fn set_diff(&mut self, attr: AttrId, order: u32, variable: &str) -> Result<(), AttrError> {
        let attribute = self.attrs.get_mut(attr).ok_or(AttrError::StaleAttribute(attr))?;
        attribute.diff = (order > 0).then(|| DiffRequest {
            order,
            variable: variable.to_owned(),
        });
        Ok(())
    }

    // Typed access

    pub(crate) fn resolve(&self, module: ModuleId, name: &str) -> Result<AttrId, AttrError> {
        let owner = self
            .modules
            .get(module)
            .ok_or(AttrError::UnknownModule(module))?;
        owner.attribute(name).ok_or_else(|| AttrError::UnknownAttribute {
            module: owner.name.clone(),
            name: name.to_owned(),
        })
    }

    pub fn get<T: AttrValue>(&self, module: ModuleId, name: &str) -> Result<T, AttrError> {
        let id = self.resolve(module, name)?;
        let attr = self.attrs.get(id).ok_or(AttrError::StaleAttribute(id))?;
        T::from_value(&attr.value).ok_or_else(|| AttrError::TypeMismatch {
            name: name.to_owned(),
            expected: T::KIND,
            found: attr.value.kind(),
        })
    }

    /// Assign and notify; returns whether the value changed.
    pub fn write<T: AttrValue>(&mut self, module: ModuleId, name: &str, value: T) -> Result<bool, AttrError> {
        let id = self.resolve(module, name)?;
        self.write_value(id, value.into_value())
    }

    pub fn value(&self, attr: AttrId) -> Option<&Value> {
        self.attrs.get(attr).map(|a| &a.value)
    }

    pub fn value_f64(&self, attr: AttrId) -> Option<f64> {
        self.value(attr).and_then(Value::as_f64)
    }

    pub fn imaginary(&self, attr: AttrId) -> Option<f64> {
        self.attrs.get(attr).map(|a| a.imaginary)
    }

    pub fn is_observable(&self, module: ModuleId, name: &str) -> bool {
        self.resolve(module, name)
            .ok()
            .and_then(|id| self.attrs.get(id))
            .is_some_and(Attribute::is_observable)
    }

    pub fn has_formula(&self, module: ModuleId, name: &str) -> bool {
        self.resolve(module, name)
            .ok()
            .and_then(|id| self.attrs.get(id))
            .is_some_and(Attribute::has_formula)
    }

    /// Formula symbol of `attr`: lowercase `<module>_<attribute>`.
    pub fn symbol_of(&self, attr: AttrId) -> Option<String> {
        let attribute = self.attrs.get(attr)?;
        let module = self.modules.get(attribute.module)?;
        Some(format!("{}_{}", module.name, attribute.name).to_lowercase())
    }

    /// `Module.Attribute`, for messages.
    pub fn qualified_name(&self, attr: AttrId) -> String {
        let Some(attribute) = self.attrs.get(attr) else {
            return format!("{attr:?}");
        };
        match self.modules.get(attribute.module) {
            Some(module) => format!("{}.{}", module.name, attribute.name),
            None => attribute.name.clone(),
        }
    }

    pub(crate) fn behavior(&self, module: ModuleId) -> Option<Rc<dyn ModuleBehavior>> {
        self.modules.get(module).map(|m| Rc::clone(&m.behavior))
    }

    pub(crate) fn observed(&self, module: ModuleId) -> Vec<ObserveCandidate> {
        self.modules
            .get(module)
            .map(|m| m.observed.clone())
            .unwrap_or_default()
    }

    pub(crate) fn config_value(&self, module: ModuleId, key: &str) -> Option<String> {
        self.modules
            .get(module)
            .and_then(|m| m.config(key))
            .map(str::to_owned)
    }

    // Diagnostics

    /// Record a problem. Only VERBOSE passes surface it; other passes log at
    /// debug level.
    pub(crate) fn report(
        &mut self,
        mode: PrepareMode,
        severity: Severity,
        module: ModuleId,
        attribute: Option<&str>,
        message: String,
    ) {
        let module_name = self
            .modules
            .get(module)
            .map(|m| m.name.clone())
            .unwrap_or_default();
        if !mode.is_verbose() {
            debug!(module = %module_name, attribute, %message, "prepare problem");
            return;
        }
        warn!(module = %module_name, attribute, %severity, "{message}");
        self.diagnostics.push(Diagnostic {
            severity,
            module: module_name,
            attribute: attribute.map(str::to_owned),
            message,
        });
    }
}

impl Default for SimContext {
    fn default() -> Self {
        SimContext::new(EngineOptions::default())
    }
}

#[cfg(test)]
mod tests;
