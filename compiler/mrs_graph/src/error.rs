//! Errors of the attribute graph.
//!
//! None of these cross the `prepare` boundary: bind failures are folded
//! into its boolean result and reported as diagnostics in VERBOSE mode.

use mrs_formula::{EvalError, ParseError};
use thiserror::Error;

use crate::arena::{AttrId, ModuleId};
use crate::value::ValueKind;

/// A typed lookup or write could not be carried out.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AttrError {
    #[error("module {0:?} no longer exists")]
    UnknownModule(ModuleId),

    #[error("attribute {0:?} no longer exists")]
    StaleAttribute(AttrId),

    #[error("module `{module}` has no attribute `{name}`")]
    UnknownAttribute { module: String, name: String },

    #[error("attribute `{name}` holds a {found} value, not {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

/// A formula could not be bound to its attribute.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BindError {
    /// No placeholder of any candidate occurs in the text; callers treat it
    /// as a literal.
    #[error("text references no observed attribute")]
    NotSymbolic,

    #[error(transparent)]
    Attr(#[from] AttrError),

    #[error("cannot parse `{formula}`: {source}")]
    Parse {
        formula: String,
        #[source]
        source: ParseError,
    },

    #[error("`{name}` is neither an observed attribute nor a known constant")]
    UnknownSymbol { name: String },

    #[error("`{first}` and `{second}` share the formula symbol `{name}`")]
    AmbiguousSymbol {
        name: String,
        first: String,
        second: String,
    },

    #[error("`{subject}` is not observable")]
    NotObservable { subject: String },

    #[error("`{subject}` has no numeric value")]
    NotNumeric { subject: String },

    #[error("evaluating `{formula}` failed: {source}")]
    Eval {
        formula: String,
        #[source]
        source: EvalError,
    },
}

/// An `Observe` entry could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ObserveError {
    #[error("malformed Observe entry `{entry}`, expected Module.Attribute[=Token]")]
    Syntax { entry: String },

    #[error("no module named `{name}`")]
    UnknownModule { name: String },

    #[error("module `{module}` has no attribute `{name}`")]
    UnknownAttribute { module: String, name: String },
}
