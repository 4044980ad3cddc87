//! C source emission for specialized formulas.
//!
//! The generated translation unit always defines
//! `double compiled_ex(double p0)` or
//! `double compiled_ex(double p0, double p1, double p2, double p3)`.
//! Formulas mentioning `I` are computed in `double complex`; they return
//! the real part from `compiled_ex` and additionally define
//! `compiled_ex_imag` for the imaginary part.
//!
//! Every subexpression is parenthesized, so C precedence never matters.

use std::fmt::Write;

use crate::builtins::{Builtin, Constant};
use crate::error::CodegenError;
use crate::ir::{BinaryOp, ExprId, ExprKind, Formula, SymbolId};
use crate::stack::ensure_sufficient_stack;

/// Symbol of the real-part entry point.
pub const ENTRY_POINT: &str = "compiled_ex";

/// Symbol of the imaginary-part entry point (complex formulas only).
pub const IMAG_ENTRY_POINT: &str = "compiled_ex_imag";

/// A generated translation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CSource {
    pub code: String,
    /// Number of `double` parameters: 1 or 4.
    pub arity: usize,
    /// Whether `compiled_ex_imag` is defined.
    pub complex: bool,
}

const REAL_HELPERS: &str = r"
static double mrs_csgn(double x) { return x > 0.0 ? 1.0 : (x < 0.0 ? -1.0 : 0.0); }
static double mrs_mod(double x, double y) { return x - trunc(x / y) * y; }
static double mrs_equal(double x, double y) { return x == y ? 1.0 : 0.0; }
static double mrs_gt(double x, double y) { return x > y ? 1.0 : 0.0; }
static double mrs_lt(double x, double y) { return x < y ? 1.0 : 0.0; }
static double mrs_ite(double a, double b, double x, double y) { return a == b ? x : y; }
";

const COMPLEX_HELPERS: &str = r"
static double mrs_ccsgn(double complex z) {
    double r = creal(z);
    return r != 0.0 ? mrs_csgn(r) : mrs_csgn(cimag(z));
}
static double complex mrs_cite(double a, double b, double complex x, double complex y) { return a == b ? x : y; }
";

/// Render `formula` as C with `params` as the function parameters.
///
/// `vector` backs `Vector(i)` lookups that specialization could not fold.
pub fn to_c(formula: &Formula, params: &[SymbolId], vector: &[f64]) -> Result<CSource, CodegenError> {
    if params.len() != 1 && params.len() != 4 {
        return Err(CodegenError::UnsupportedArity {
            count: params.len(),
        });
    }
    for symbol in formula.free_symbols() {
        if !params.contains(&symbol) {
            return Err(CodegenError::UnboundSymbol {
                name: formula.symbol_name(symbol).to_owned(),
            });
        }
    }

    let complex = formula.uses_imaginary();
    let emitter = Emitter {
        formula,
        params,
        complex,
    };
    let mut body = String::new();
    emitter.expr(formula.root(), &mut body);

    let mut code = String::with_capacity(body.len() + 1024);
    code.push_str("#include <math.h>\n");
    if complex {
        code.push_str("#include <complex.h>\n");
    }
    code.push_str(REAL_HELPERS);
    if complex {
        code.push_str(COMPLEX_HELPERS);
    }
    write_vector(vector, formula.uses_vector(), &mut code);

    let signature = params
        .iter()
        .enumerate()
        .map(|(i, _)| format!("double p{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let call_args = (0..params.len())
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    if complex {
        let _ = write!(
            code,
            "\nstatic double complex mrs_value({signature}) {{\n    return {body};\n}}\n\
             \ndouble {ENTRY_POINT}({signature}) {{\n    return creal(mrs_value({call_args}));\n}}\n\
             \ndouble {IMAG_ENTRY_POINT}({signature}) {{\n    return cimag(mrs_value({call_args}));\n}}\n"
        );
    } else {
        let _ = write!(
            code,
            "\ndouble {ENTRY_POINT}({signature}) {{\n    return {body};\n}}\n"
        );
    }

    Ok(CSource {
        code,
        arity: params.len(),
        complex,
    })
}

fn write_vector(vector: &[f64], used: bool, code: &mut String) {
    if !used {
        return;
    }
    if vector.is_empty() {
        code.push_str("\nstatic double mrs_vector_at(double i) { (void)i; return 0.0; }\n");
        return;
    }
    let _ = write!(code, "\nstatic const double mrs_vector[{}] = {{", vector.len());
    for (i, value) in vector.iter().enumerate() {
        if i > 0 {
            code.push_str(", ");
        }
        code.push_str(&c_number(*value));
    }
    let _ = write!(
        code,
        "}};\nstatic double mrs_vector_at(double i) {{\n    \
         double k = trunc(i);\n    \
         return (k >= 0.0 && k < {}.0) ? mrs_vector[(int)k] : 0.0;\n}}\n",
        vector.len()
    );
}

/// C literal for a double.
fn c_number(value: f64) -> String {
    if value.is_nan() {
        "NAN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 {
            "INFINITY".to_owned()
        } else {
            "(-INFINITY)".to_owned()
        }
    } else if value.is_sign_negative() {
        format!("({value:?})")
    } else {
        format!("{value:?}")
    }
}

struct Emitter<'a> {
    formula: &'a Formula,
    params: &'a [SymbolId],
    complex: bool,
}

impl Emitter<'_> {
    fn expr(&self, id: ExprId, out: &mut String) {
        let arena = self.formula.arena();
        ensure_sufficient_stack(|| match *arena.get(id) {
            ExprKind::Num(value) => out.push_str(&c_number(value)),
            ExprKind::Const(Constant::Pi) => out.push_str(&c_number(std::f64::consts::PI)),
            ExprKind::Const(Constant::E) => out.push_str(&c_number(std::f64::consts::E)),
            ExprKind::Const(Constant::I) => out.push('I'),
            ExprKind::Sym(symbol) => {
                let index = self
                    .params
                    .iter()
                    .position(|&param| param == symbol)
                    .unwrap_or(0);
                let _ = write!(out, "p{index}");
            }
            ExprKind::Neg(operand) => {
                out.push_str("(-");
                self.expr(operand, out);
                out.push(')');
            }
            ExprKind::Binary {
                op: BinaryOp::Pow,
                left,
                right,
            } => {
                out.push_str(if self.complex { "cpow(" } else { "pow(" });
                self.expr(left, out);
                out.push_str(", ");
                self.expr(right, out);
                out.push(')');
            }
            ExprKind::Binary { op, left, right } => {
                out.push('(');
                self.expr(left, out);
                let _ = write!(out, " {} ", op.symbol());
                self.expr(right, out);
                out.push(')');
            }
            ExprKind::Call { func, args } => self.call(func, arena.args(args), out),
        });
    }

    /// An argument reduced to its real part where the C helper takes `double`.
    fn real_arg(&self, id: ExprId, out: &mut String) {
        if self.complex {
            out.push_str("creal(");
            self.expr(id, out);
            out.push(')');
        } else {
            self.expr(id, out);
        }
    }

    fn call(&self, func: Builtin, args: &[ExprId], out: &mut String) {
        let name = match (func, self.complex) {
            (Builtin::Sin, false) => "sin",
            (Builtin::Sin, true) => "csin",
            (Builtin::Cos, false) => "cos",
            (Builtin::Cos, true) => "ccos",
            (Builtin::Tan, false) => "tan",
            (Builtin::Tan, true) => "ctan",
            (Builtin::Asin, false) => "asin",
            (Builtin::Asin, true) => "casin",
            (Builtin::Acos, false) => "acos",
            (Builtin::Acos, true) => "cacos",
            (Builtin::Atan, false) => "atan",
            (Builtin::Atan, true) => "catan",
            (Builtin::Sinh, false) => "sinh",
            (Builtin::Sinh, true) => "csinh",
            (Builtin::Cosh, false) => "cosh",
            (Builtin::Cosh, true) => "ccosh",
            (Builtin::Tanh, false) => "tanh",
            (Builtin::Tanh, true) => "ctanh",
            (Builtin::Exp, false) => "exp",
            (Builtin::Exp, true) => "cexp",
            (Builtin::Log, false) => "log",
            (Builtin::Log, true) => "clog",
            (Builtin::Sqrt, false) => "sqrt",
            (Builtin::Sqrt, true) => "csqrt",
            (Builtin::Abs, false) => "fabs",
            (Builtin::Abs, true) => "cabs",
            (Builtin::Csgn, false) => "mrs_csgn",
            (Builtin::Csgn, true) => "mrs_ccsgn",
            (Builtin::Ite, true) => "mrs_cite",
            (Builtin::Ite, false) => "mrs_ite",
            (Builtin::Atan2, _) => "atan2",
            (Builtin::Floor, _) => "trunc",
            (Builtin::Mod, _) => "mrs_mod",
            (Builtin::Equal, _) => "mrs_equal",
            (Builtin::Gt, _) => "mrs_gt",
            (Builtin::Lt, _) => "mrs_lt",
            (Builtin::Vector, _) => "mrs_vector_at",
        };

        out.push_str(name);
        out.push('(');
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let takes_real = match func {
                Builtin::Atan2
                | Builtin::Floor
                | Builtin::Mod
                | Builtin::Equal
                | Builtin::Gt
                | Builtin::Lt
                | Builtin::Vector => true,
                Builtin::Ite => i < 2,
                _ => false,
            };
            if takes_real {
                self.real_arg(arg, out);
            } else {
                self.expr(arg, out);
            }
        }
        out.push(')');
    }
}
