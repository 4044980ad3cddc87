//! Per-class module behavior.
//!
//! The engine itself only knows how attributes are bound and kept up to
//! date. Which attributes a module has, and any class-specific binding, is
//! supplied by a [`ModuleBehavior`].

use crate::arena::ModuleId;
use crate::context::SimContext;

/// Phase of [`SimContext::prepare`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrepareMode {
    /// Declare attributes and bind configuration silently.
    Init,
    /// Like `Init`, reporting every problem as a diagnostic.
    Verbose,
    /// Re-prepare after a subject changed; nothing is re-bound.
    Update,
}

impl PrepareMode {
    pub fn is_verbose(self) -> bool {
        self == PrepareMode::Verbose
    }
}

pub trait ModuleBehavior {
    fn class_name(&self) -> &'static str;

    /// Whether the module has a `Duration`.
    fn is_sequence(&self) -> bool {
        false
    }

    /// Configuration keys this behavior binds itself.
    fn handles(&self, _key: &str) -> bool {
        false
    }

    /// Declare the class attributes. Called before every INIT/VERBOSE pass;
    /// declarations of existing attributes are no-ops.
    fn declare(&self, _ctx: &mut SimContext, _module: ModuleId) {}

    /// Class-specific work after the generic configuration was bound, and
    /// the whole of an UPDATE pass.
    fn prepare(&self, _ctx: &mut SimContext, _module: ModuleId, _mode: PrepareMode) -> bool {
        true
    }
}
