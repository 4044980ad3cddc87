//! Engine configuration.

use std::path::PathBuf;

use mrs_native::CompilerCommand;
use tracing::warn;

/// How hot-path formulas are evaluated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EvalStrategy {
    /// Always walk the expression tree.
    Interpreted,
    /// Specialize, compile to native code and fall back to the interpreter
    /// if the toolchain fails.
    #[default]
    Native,
}

/// How deep a cascade may recurse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Recurse until no value changes. Cyclic graphs may not terminate.
    #[default]
    Converge,
    /// Stop fanning out below this many nested notifications.
    DepthLimit(usize),
}

/// Settings carried by a [`SimContext`](crate::SimContext).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub strategy: EvalStrategy,
    pub compiler: CompilerCommand,
    /// Where C sources and shared objects go; a private temporary
    /// directory when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Specializations kept per attribute before it stays interpreted.
    pub max_compile_slots: usize,
    pub cascade: CascadePolicy,
    /// Report dependency cycles while binding in VERBOSE mode.
    pub warn_on_cycles: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            strategy: EvalStrategy::default(),
            compiler: CompilerCommand::default(),
            scratch_dir: None,
            max_compile_slots: 64,
            cascade: CascadePolicy::default(),
            warn_on_cycles: true,
        }
    }
}

impl EngineOptions {
    /// Defaults overridden by `MRS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `MRS_*` keys.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = EngineOptions::default();

        if let Some(value) = lookup("MRS_EVAL_STRATEGY") {
            match value.trim().to_ascii_lowercase().as_str() {
                "interpreted" => options.strategy = EvalStrategy::Interpreted,
                "native" => options.strategy = EvalStrategy::Native,
                other => warn!(value = other, "ignoring unknown MRS_EVAL_STRATEGY"),
            }
        }
        if let Some(program) = lookup("MRS_CC").filter(|v| !v.trim().is_empty()) {
            options.compiler = CompilerCommand::Cc {
                program: program.trim().to_owned(),
            };
        }
        if let Some(path) = lookup("MRS_EXCOMPILER").filter(|v| !v.trim().is_empty()) {
            options.compiler = CompilerCommand::Script {
                path: PathBuf::from(path.trim()),
            };
        }
        if let Some(dir) = lookup("MRS_COMPILE_DIR").filter(|v| !v.trim().is_empty()) {
            options.scratch_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(value) = lookup("MRS_MAX_COMPILE_SLOTS") {
            match value.trim().parse() {
                Ok(slots) => options.max_compile_slots = slots,
                Err(_) => warn!(value = %value, "ignoring invalid MRS_MAX_COMPILE_SLOTS"),
            }
        }
        if let Some(value) = lookup("MRS_MAX_CASCADE_DEPTH") {
            match value.trim().parse() {
                Ok(0) => options.cascade = CascadePolicy::Converge,
                Ok(depth) => options.cascade = CascadePolicy::DepthLimit(depth),
                Err(_) => warn!(value = %value, "ignoring invalid MRS_MAX_CASCADE_DEPTH"),
            }
        }

        options
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: EvalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerCommand) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_max_compile_slots(mut self, slots: usize) -> Self {
        self.max_compile_slots = slots;
        self
    }

    #[must_use]
    pub fn with_cascade(mut self, cascade: CascadePolicy) -> Self {
        self.cascade = cascade;
        self
    }

    #[must_use]
    pub fn with_cycle_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_cycles = enabled;
        self
    }
}

#[cfg(test)]
mod tests;
