//! Formula language for sequence-module attributes.
//!
//! A formula is plain text such as `a1*2` or `sin(2*Pi*c1*AnalyticTime)`.
//! This crate turns it into a flat, folded expression tree and provides the
//! operations the attribute engine needs:
//!
//! - [`parse`]: text to [`Formula`] (logos lexer, precedence-chain parser)
//! - [`lexer::rewrite_identifiers`]: token-level placeholder substitution
//! - [`Formula::eval`]: complex numeric evaluation against [`Bindings`]
//! - [`Formula::specialize`]: substitute known values and fold
//! - [`Formula::derivative`]: n-th symbolic derivative
//! - [`codegen_c::to_c`]: C source for the native evaluation tier
//!
//! Formulas are immutable once built; every transformation returns a new
//! [`Formula`] with its own arena.

mod builtins;
pub mod codegen_c;
mod diff;
mod display;
mod error;
mod eval;
mod ir;
pub mod lexer;
mod parser;
mod rewrite;
mod span;
mod stack;

pub use builtins::{Builtin, Constant};
pub use codegen_c::{to_c, CSource};
pub use error::{CodegenError, EvalError, LexError, ParseError, ParseErrorKind};
pub use eval::Bindings;
pub use ir::{BinaryOp, ExprArena, ExprId, ExprKind, ExprRange, Formula, SymbolId};
pub use num_complex::Complex64;
pub use parser::parse;
pub use rewrite::unbound_symbols;
pub use span::Span;
pub use stack::ensure_sufficient_stack;
