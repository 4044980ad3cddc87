//! Attribute dependency graph for sequence modules.
//!
//! Modules form a tree inside a [`SimContext`] and own named, typed
//! [`Attribute`]s. A configured value is either a literal or a formula over
//! other attributes (its subjects). Binding a formula links the attribute to
//! its subjects in both directions; writing a subject re-evaluates every
//! observer, depth first, until values stop changing.
//!
//! - [`SimContext::prepare`]: the INIT / VERBOSE / UPDATE contract
//! - [`SimContext::set_member`]: bind formula text to an attribute
//! - [`SimContext::eval_expression`]: recompute from current subject values
//! - [`SimContext::notify`]: propagate a change to observers
//! - [`SimContext::eval_compiled`] / [`SimContext::eval_compiled_nlg`]: hot
//!   paths served by natively compiled specializations
//!
//! The graph may contain cycles. They are reported in VERBOSE mode and
//! either converge through change detection or are cut by
//! [`CascadePolicy::DepthLimit`].

mod arena;
mod attribute;
mod behavior;
pub mod behaviors;
mod binder;
mod compiled;
mod context;
mod diagnostics;
mod error;
mod eval;
mod module;
mod notify;
mod options;
mod prepare;
mod stats;
mod value;

pub use arena::{AttrId, ModuleId};
pub use attribute::{AttrFlags, Attribute, Visibility};
pub use behavior::{ModuleBehavior, PrepareMode};
pub use compiled::NLG_ATTRIBUTES;
pub use context::SimContext;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{AttrError, BindError, ObserveError};
pub use eval::Evaluation;
pub use module::{Module, ObserveCandidate};
pub use options::{CascadePolicy, EngineOptions, EvalStrategy};
pub use stats::EngineStats;
pub use value::{AttrValue, PulseAxis, Value, ValueKind};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=mrs_graph=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
