//! The prepare contract.
//!
//! INIT and VERBOSE passes declare attributes, resolve `Observe`, read
//! `Vector` and bind every configured value; VERBOSE additionally reports
//! each failure. UPDATE passes skip declaration and binding: they re-run
//! every bound formula of the module, then the module behavior. Results are
//! AND-ed, over attributes and over the tree.

use mrs_formula::ensure_sufficient_stack;
use rustc_hash::FxHashSet;
use tracing::{debug, instrument};

use crate::arena::{AttrId, ModuleId};
use crate::behavior::PrepareMode;
use crate::context::SimContext;
use crate::diagnostics::Severity;
use crate::error::ObserveError;
use crate::module::ObserveCandidate;
use crate::value::Value;

/// Keys every module interprets before the rest of its configuration.
const RESERVED_KEYS: [&str; 3] = ["Name", "Observe", "Vector"];

impl SimContext {
    /// Prepare one module.
    #[instrument(level = "debug", skip(self))]
    pub fn prepare(&mut self, module: ModuleId, mode: PrepareMode) -> bool {
        let Some(behavior) = self.behavior(module) else {
            return false;
        };
        if mode == PrepareMode::Update {
            self.reevaluate_module(module, None);
            return behavior.prepare(self, module, mode);
        }

        if let Some(m) = self.modules.get_mut(module) {
            m.prepared = true;
        }
        self.declare_all(module, &*behavior);
        let config = self
            .modules
            .get(module)
            .map(|m| m.config.clone())
            .unwrap_or_default();
        let lookup = |key: &str| config.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        let mut ok = true;

        if let Some(name) = lookup("Name") {
            self.rename_module(module, name.trim());
        }
        if let Some(text) = lookup("Vector") {
            ok &= self.read_vector(module, text, mode);
        }
        let candidates = match lookup("Observe") {
            Some(text) => {
                if let Some(attr) = self.find_attribute(module, "Observe") {
                    self.assign(attr, Value::Str(text.to_owned()));
                }
                let (candidates, resolved) = self.resolve_observe(module, text, mode);
                ok &= resolved;
                candidates
            }
            None => Vec::new(),
        };
        if let Some(m) = self.modules.get_mut(module) {
            m.observed.clone_from(&candidates);
        }

        for (key, text) in &config {
            if RESERVED_KEYS.contains(&key.as_str()) || behavior.handles(key) {
                continue;
            }
            let Some(attr) = self.find_attribute(module, key) else {
                self.report(
                    mode,
                    Severity::Error,
                    module,
                    Some(key.as_str()),
                    format!("unknown attribute `{key}`"),
                );
                ok = false;
                continue;
            };
            if !self.attrs.get(attr).is_some_and(|a| a.is_observable()) {
                continue;
            }
            ok &= self.bind_config(attr, text, &candidates, mode);
            if mode.is_verbose() && self.options.warn_on_cycles {
                self.report_cycle(attr, mode);
            }
        }

        ok &= behavior.prepare(self, module, mode);
        debug!(ok, "prepared");
        ok
    }

    /// Re-run the formula of every attribute of `module` except `skip`.
    pub(crate) fn reevaluate_module(&mut self, module: ModuleId, skip: Option<AttrId>) {
        let order = self.modules.get(module).map(|m| m.order.clone()).unwrap_or_default();
        for attr in order.into_iter().filter(|a| Some(*a) != skip) {
            if let Err(err) = self.eval_expression(attr) {
                debug!(attr = %self.qualified_name(attr), %err, "kept its value");
            }
        }
    }

    /// Prepare `root` and its subtree, parents first.
    pub fn prepare_tree(&mut self, root: ModuleId, mode: PrepareMode) -> bool {
        let mut ok = self.prepare(root, mode);
        let children = self.children(root).to_vec();
        for child in children {
            ok &= ensure_sufficient_stack(|| self.prepare_tree(child, mode));
        }
        ok
    }

    /// Prepare every tree in the context.
    pub fn prepare_all(&mut self, mode: PrepareMode) -> bool {
        let roots = self.roots.clone();
        let mut ok = true;
        for root in roots {
            ok &= self.prepare_tree(root, mode);
        }
        ok
    }

    fn rename_module(&mut self, module: ModuleId, name: &str) {
        let Some(m) = self.modules.get_mut(module) else {
            return;
        };
        if m.name != name {
            debug!(from = %m.name, to = name, "renamed module");
            name.clone_into(&mut m.name);
        }
        if let Some(attr) = self.find_attribute(module, "Name") {
            self.assign(attr, Value::Str(name.to_owned()));
        }
    }

    fn read_vector(&mut self, module: ModuleId, text: &str, mode: PrepareMode) -> bool {
        let mut ok = true;
        let mut vector = Vec::new();
        for item in text.split_whitespace() {
            match item.parse::<f64>() {
                Ok(value) => vector.push(value),
                Err(_) => {
                    self.report(
                        mode,
                        Severity::Error,
                        module,
                        Some("Vector"),
                        format!("`{item}` is not a number"),
                    );
                    ok = false;
                }
            }
        }
        if let Some(m) = self.modules.get_mut(module) {
            m.vector = vector;
        }
        if let Some(attr) = self.find_attribute(module, "Vector") {
            self.assign(attr, Value::Str(text.to_owned()));
        }
        ok
    }

    /// Parse `Module.Attribute[=Token], ...` into binder candidates.
    ///
    /// Entries without a token get the positional placeholder `a1`, `a2`, ...
    /// Observed modules that were never prepared are prepared (INIT) first.
    fn resolve_observe(
        &mut self,
        module: ModuleId,
        text: &str,
        mode: PrepareMode,
    ) -> (Vec<ObserveCandidate>, bool) {
        let mut candidates = Vec::new();
        let mut ok = true;
        let entries = text.split(',').map(str::trim).filter(|e| !e.is_empty());
        for (index, entry) in entries.enumerate() {
            match self.resolve_observe_entry(entry, index + 1) {
                Ok(candidate) => candidates.push(candidate),
                Err(err) => {
                    self.report(mode, Severity::Error, module, Some("Observe"), err.to_string());
                    ok = false;
                }
            }
        }
        (candidates, ok)
    }

    fn resolve_observe_entry(
        &mut self,
        entry: &str,
        position: usize,
    ) -> Result<ObserveCandidate, ObserveError> {
        let (target, placeholder) = match entry.split_once('=') {
            Some((target, token)) => (target.trim(), token.trim().to_owned()),
            None => (entry, format!("a{position}")),
        };
        let syntax = || ObserveError::Syntax {
            entry: entry.to_owned(),
        };
        let (module_name, attr_name) = target.split_once('.').ok_or_else(syntax)?;
        let (module_name, attr_name) = (module_name.trim(), attr_name.trim());
        if module_name.is_empty() || attr_name.is_empty() || placeholder.is_empty() {
            return Err(syntax());
        }

        let observed = self
            .find_module(module_name)
            .ok_or_else(|| ObserveError::UnknownModule {
                name: module_name.to_owned(),
            })?;
        if !self.modules.get(observed).is_some_and(|m| m.prepared) {
            self.prepare(observed, PrepareMode::Init);
        }
        let subject = self
            .find_attribute(observed, attr_name)
            .ok_or_else(|| ObserveError::UnknownAttribute {
                module: module_name.to_owned(),
                name: attr_name.to_owned(),
            })?;
        Ok(ObserveCandidate::new(subject, placeholder))
    }

    /// Subject path that leads from `attr` back to itself, if any.
    pub fn find_cycle(&self, attr: AttrId) -> Option<Vec<AttrId>> {
        let mut path = vec![attr];
        let mut stack: Vec<(AttrId, usize)> = vec![(attr, 0)];
        let mut visited: FxHashSet<AttrId> = FxHashSet::default();
        visited.insert(attr);

        while let Some((node, next)) = stack.last_mut() {
            let subjects = self.attrs.get(*node).map_or(&[][..], |a| a.subjects.as_slice());
            let Some(&subject) = subjects.get(*next) else {
                stack.pop();
                path.pop();
                continue;
            };
            *next += 1;
            if subject == attr {
                path.push(attr);
                return Some(path);
            }
            if visited.insert(subject) {
                stack.push((subject, 0));
                path.push(subject);
            }
        }
        None
    }

    fn report_cycle(&mut self, attr: AttrId, mode: PrepareMode) {
        let Some(cycle) = self.find_cycle(attr) else {
            return;
        };
        let rendered = cycle
            .iter()
            .map(|id| self.qualified_name(*id))
            .collect::<Vec<_>>()
            .join(" -> ");
        self.report_attr(
            mode,
            Severity::Warning,
            attr,
            format!("dependency cycle {rendered}; updates may not terminate"),
        );
    }
}

#[cfg(test)]
mod tests;
