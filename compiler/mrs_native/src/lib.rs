//! Native evaluation tier.
//!
//! Takes the C translation units produced by `mrs_formula::to_c`, compiles
//! them with an external compiler into shared objects, loads them and hands
//! out [`CompiledFunction`]s. Loading requires `unsafe`; this is the only
//! crate in the workspace that contains any.
//!
//! Compiled functions are cached by source text, so re-specializing a
//! formula to values it has seen before costs a hash lookup.

mod cache;
mod compiler;
mod error;
mod library;

pub use cache::{DisabledBackend, NativeBackend, NativeCompiler, NativeStats};
pub use compiler::CompilerCommand;
pub use error::NativeError;
pub use library::CompiledFunction;

/// Compile a trivial function to check whether the tier works here.
pub fn probe(backend: &mut dyn NativeBackend) -> Result<(), NativeError> {
    let formula = mrs_formula::parse("2*x + 1").map_err(|_| NativeError::Disabled)?;
    let params = formula.free_symbols();
    let source = mrs_formula::to_c(&formula, &params, &[])?;
    let function = backend.compile(&source)?;
    match function.call(&[20.0]) {
        Some(value) if (value - 41.0).abs() < 1e-12 => Ok(()),
        _ => Err(NativeError::Disabled),
    }
}
