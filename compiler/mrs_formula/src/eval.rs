//! Numeric evaluation.
//!
//! Values are complex throughout. Real inputs take real fast paths and only
//! leave the real line where the real function is undefined (`sqrt(-1)`,
//! `log(-2)`, `asin(2)`, negative base with fractional exponent).

use num_complex::Complex64;

use crate::builtins::{Builtin, Constant};
use crate::error::EvalError;
use crate::ir::{BinaryOp, ExprId, ExprKind, Formula, SymbolId};
use crate::stack::ensure_sufficient_stack;

/// Numeric values for the symbols of one formula.
///
/// Indexed by [`SymbolId`], so a table built for one formula must not be
/// used with another.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: Vec<Option<Complex64>>,
    vector: Vec<f64>,
}

impl Bindings {
    /// Empty table sized for `formula`.
    pub fn for_formula(formula: &Formula) -> Self {
        Bindings {
            values: vec![None; formula.symbol_count()],
            vector: Vec::new(),
        }
    }

    /// Elements read by `Vector(i)`.
    #[must_use]
    pub fn with_vector(mut self, vector: Vec<f64>) -> Self {
        self.vector = vector;
        self
    }

    pub fn set_vector(&mut self, vector: &[f64]) {
        self.vector.clear();
        self.vector.extend_from_slice(vector);
    }

    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    pub fn set(&mut self, symbol: SymbolId, value: f64) {
        self.set_complex(symbol, Complex64::new(value, 0.0));
    }

    pub fn set_complex(&mut self, symbol: SymbolId, value: Complex64) {
        let index = symbol.index();
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value);
    }

    /// Bind by name; returns false if `formula` has no such symbol.
    pub fn set_by_name(&mut self, formula: &Formula, name: &str, value: f64) -> bool {
        match formula.symbol(name) {
            Some(symbol) => {
                self.set(symbol, value);
                true
            }
            None => false,
        }
    }

    pub fn unset(&mut self, symbol: SymbolId) {
        if let Some(slot) = self.values.get_mut(symbol.index()) {
            *slot = None;
        }
    }

    #[inline]
    pub fn get(&self, symbol: SymbolId) -> Option<Complex64> {
        self.values.get(symbol.index()).copied().flatten()
    }
}

impl Formula {
    /// Evaluate with every free symbol bound.
    pub fn eval(&self, bindings: &Bindings) -> Result<Complex64, EvalError> {
        self.eval_node(self.root, bindings)
    }

    /// Evaluate and keep only the real part.
    pub fn eval_real(&self, bindings: &Bindings) -> Result<f64, EvalError> {
        self.eval(bindings).map(|value| value.re)
    }

    pub(crate) fn eval_node(&self, id: ExprId, bindings: &Bindings) -> Result<Complex64, EvalError> {
        ensure_sufficient_stack(|| match *self.arena.get(id) {
            ExprKind::Num(value) => Ok(real(value)),
            ExprKind::Const(constant) => Ok(constant_value(constant)),
            ExprKind::Sym(symbol) => bindings.get(symbol).ok_or_else(|| EvalError::UnboundSymbol {
                name: self.arena.symbol_name(symbol).to_owned(),
            }),
            ExprKind::Neg(operand) => Ok(-self.eval_node(operand, bindings)?),
            ExprKind::Binary { op, left, right } => {
                let a = self.eval_node(left, bindings)?;
                let b = self.eval_node(right, bindings)?;
                apply_binary(op, a, b)
            }
            ExprKind::Call { func, args } => {
                let args = self.arena.args(args);
                let mut values = [Complex64::new(0.0, 0.0); 4];
                for (slot, &arg) in values.iter_mut().zip(args) {
                    *slot = self.eval_node(arg, bindings)?;
                }
                apply_builtin(func, &values[..args.len()], bindings.vector())
            }
        })
    }
}

#[inline]
fn real(value: f64) -> Complex64 {
    Complex64::new(value, 0.0)
}

pub(crate) fn constant_value(constant: Constant) -> Complex64 {
    match constant {
        Constant::Pi => real(std::f64::consts::PI),
        Constant::E => real(std::f64::consts::E),
        Constant::I => Complex64::i(),
    }
}

#[inline]
fn is_zero(value: Complex64) -> bool {
    value.re == 0.0 && value.im == 0.0
}

pub(crate) fn apply_binary(op: BinaryOp, a: Complex64, b: Complex64) -> Result<Complex64, EvalError> {
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => {
            if a.im == 0.0 && b.im == 0.0 {
                real(a.re * b.re)
            } else {
                a * b
            }
        }
        BinaryOp::Div => {
            if is_zero(b) {
                return Err(EvalError::DivisionByZero);
            }
            if a.im == 0.0 && b.im == 0.0 {
                real(a.re / b.re)
            } else {
                a / b
            }
        }
        BinaryOp::Pow => pow(a, b)?,
    })
}

fn pow(base: Complex64, exponent: Complex64) -> Result<Complex64, EvalError> {
    if base.im == 0.0 && exponent.im == 0.0 {
        let (a, b) = (base.re, exponent.re);
        if a == 0.0 && b < 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        if a >= 0.0 || b.fract() == 0.0 || a.is_nan() || b.is_nan() {
            return Ok(real(a.powf(b)));
        }
    }
    if is_zero(base) {
        return Ok(real(0.0));
    }
    Ok(base.powc(exponent))
}

/// Real function first; complex function where the real one is undefined.
#[inline]
fn real_or_complex(
    z: Complex64,
    real_fn: impl Fn(f64) -> f64,
    complex_fn: impl Fn(Complex64) -> Complex64,
) -> Complex64 {
    if z.im == 0.0 {
        let value = real_fn(z.re);
        if !value.is_nan() || z.re.is_nan() {
            return real(value);
        }
    }
    complex_fn(z)
}

/// Sign of the real part, or of the imaginary part on the imaginary axis.
pub(crate) fn csgn(z: Complex64) -> f64 {
    let sign = |x: f64| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    };
    if z.re == 0.0 {
        sign(z.im)
    } else {
        sign(z.re)
    }
}

pub(crate) fn apply_builtin(
    func: Builtin,
    args: &[Complex64],
    vector: &[f64],
) -> Result<Complex64, EvalError> {
    let arg = |i: usize| args.get(i).copied().unwrap_or_default();
    let x = arg(0);
    Ok(match func {
        Builtin::Sin => real_or_complex(x, f64::sin, Complex64::sin),
        Builtin::Cos => real_or_complex(x, f64::cos, Complex64::cos),
        Builtin::Tan => real_or_complex(x, f64::tan, Complex64::tan),
        Builtin::Asin => real_or_complex(x, f64::asin, Complex64::asin),
        Builtin::Acos => real_or_complex(x, f64::acos, Complex64::acos),
        Builtin::Atan => real_or_complex(x, f64::atan, Complex64::atan),
        Builtin::Atan2 => real(x.re.atan2(arg(1).re)),
        Builtin::Sinh => real_or_complex(x, f64::sinh, Complex64::sinh),
        Builtin::Cosh => real_or_complex(x, f64::cosh, Complex64::cosh),
        Builtin::Tanh => real_or_complex(x, f64::tanh, Complex64::tanh),
        Builtin::Exp => real_or_complex(x, f64::exp, Complex64::exp),
        Builtin::Log => {
            if is_zero(x) {
                return Err(EvalError::DivisionByZero);
            }
            real_or_complex(x, f64::ln, Complex64::ln)
        }
        Builtin::Sqrt => real_or_complex(x, f64::sqrt, Complex64::sqrt),
        Builtin::Abs => real(x.norm()),
        Builtin::Csgn => real(csgn(x)),
        Builtin::Floor => real(x.re.trunc()),
        Builtin::Mod => {
            let y = arg(1);
            if y.re == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            real(x.re - (x.re / y.re).trunc() * y.re)
        }
        Builtin::Equal => real(f64::from(u8::from(x.re == arg(1).re))),
        Builtin::Gt => real(f64::from(u8::from(x.re > arg(1).re))),
        Builtin::Lt => real(f64::from(u8::from(x.re < arg(1).re))),
        Builtin::Ite => {
            if x.re == arg(1).re {
                arg(2)
            } else {
                arg(3)
            }
        }
        Builtin::Vector => real(vector_element(vector, x.re)),
    })
}

/// `Vector(i)`: truncated index, 0 outside the vector.
pub(crate) fn vector_element(vector: &[f64], index: f64) -> f64 {
    let index = index.trunc();
    if index.is_nan() || index < 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = index as usize;
    vector.get(index).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests;
