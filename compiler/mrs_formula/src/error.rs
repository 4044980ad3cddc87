//! Error types for lexing, parsing, evaluation and C emission.

use thiserror::Error;

use crate::Span;

/// A formula could not be tokenized.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character sequence that is not part of the formula language.
    #[error("unexpected character sequence `{text}` at {span}")]
    InvalidToken { text: String, span: Span },
    /// Source longer than a span can address.
    #[error("formula is {len} bytes long, which exceeds the supported size")]
    TooLong { len: usize },
}

/// What went wrong while parsing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("empty formula")]
    Empty,
    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("expected {expected}, found end of formula")]
    UnexpectedEof { expected: &'static str },
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("function `{name}` takes {expected} argument(s), {found} given")]
    WrongArity {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}

/// A formula failed to parse.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} (at {span})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        let span = match &err {
            LexError::InvalidToken { span, .. } => *span,
            LexError::TooLong { .. } => Span::default(),
        };
        ParseError::new(ParseErrorKind::Lex(err), span)
    }
}

/// Numeric evaluation failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A symbol had no value bound to it.
    #[error("symbol `{name}` has no value")]
    UnboundSymbol { name: String },
    /// Exact division by zero (a pole).
    #[error("division by zero")]
    DivisionByZero,
}

/// A formula could not be rendered as C.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A symbol remained free that is not a function parameter.
    #[error("symbol `{name}` is neither a parameter nor specialized away")]
    UnboundSymbol { name: String },
    /// More parameters than the emitted signature supports.
    #[error("compiled functions take 1 or 4 parameters, {count} requested")]
    UnsupportedArity { count: usize },
}
