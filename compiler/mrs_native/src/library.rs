//! Loaded shared objects and the functions taken from them.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use libloading::Library;
use mrs_formula::codegen_c::{ENTRY_POINT, IMAG_ENTRY_POINT};

use crate::error::NativeError;

type Unary = unsafe extern "C" fn(f64) -> f64;
type Quaternary = unsafe extern "C" fn(f64, f64, f64, f64) -> f64;

/// A raw entry point of one of the two supported signatures.
#[derive(Copy, Clone)]
enum RawFn {
    Unary(Unary),
    Quaternary(Quaternary),
}

impl RawFn {
    fn call(self, args: &[f64]) -> Option<f64> {
        // SAFETY: the pointer was resolved from a library that `CompiledFunction`
        // keeps loaded, and the emitted C signature matches the variant.
        match (self, args) {
            (RawFn::Unary(f), &[x]) => Some(unsafe { f(x) }),
            (RawFn::Quaternary(f), &[x, y, z, g]) => Some(unsafe { f(x, y, z, g) }),
            _ => None,
        }
    }
}

/// A compiled formula, callable while any clone of it is alive.
#[derive(Clone)]
pub struct CompiledFunction {
    real: RawFn,
    imag: Option<RawFn>,
    arity: usize,
    _library: Rc<Library>,
}

impl CompiledFunction {
    /// Load `path` and resolve its entry points.
    pub(crate) fn load(path: &Path, arity: usize, complex: bool) -> Result<Self, NativeError> {
        // SAFETY: the library is one we just compiled; its initializers are
        // those of a plain C translation unit without constructors.
        let library = unsafe { Library::new(path) }.map_err(|e| NativeError::Load {
            path: path.to_owned(),
            message: e.to_string(),
        })?;

        let real = resolve(&library, path, ENTRY_POINT, arity)?;
        let imag = if complex {
            Some(resolve(&library, path, IMAG_ENTRY_POINT, arity)?)
        } else {
            None
        };

        Ok(CompiledFunction {
            real,
            imag,
            arity,
            _library: Rc::new(library),
        })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_complex(&self) -> bool {
        self.imag.is_some()
    }

    /// Real part; `None` if `args` does not match the arity.
    #[inline]
    pub fn call(&self, args: &[f64]) -> Option<f64> {
        self.real.call(args)
    }

    /// Imaginary part; 0 for real formulas.
    #[inline]
    pub fn call_imag(&self, args: &[f64]) -> Option<f64> {
        match self.imag {
            Some(imag) => imag.call(args),
            None => (args.len() == self.arity).then_some(0.0),
        }
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("arity", &self.arity)
            .field("complex", &self.is_complex())
            .finish_non_exhaustive()
    }
}

fn resolve(
    library: &Library,
    path: &Path,
    symbol: &'static str,
    arity: usize,
) -> Result<RawFn, NativeError> {
    let missing = || NativeError::MissingSymbol {
        path: path.to_owned(),
        symbol,
    };
    // SAFETY: the symbol types mirror the signatures emitted by `to_c`.
    unsafe {
        match arity {
            1 => library
                .get::<Unary>(symbol.as_bytes())
                .map(|f| RawFn::Unary(*f))
                .map_err(|_| missing()),
            4 => library
                .get::<Quaternary>(symbol.as_bytes())
                .map(|f| RawFn::Quaternary(*f))
                .map_err(|_| missing()),
            _ => Err(missing()),
        }
    }
}
