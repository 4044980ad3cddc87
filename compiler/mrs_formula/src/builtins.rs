//! Built-in constants and functions of the formula language.
//!
//! The set is closed, so dispatch is a plain `match` everywhere
//! (evaluation, differentiation, C emission).

use std::fmt;

/// Named constants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    /// π
    Pi,
    /// Euler's number.
    E,
    /// Imaginary unit.
    I,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Pi" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            "I" => Some(Constant::I),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "Pi",
            Constant::E => "E",
            Constant::I => "I",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in functions.
///
/// `step` is accepted as a spelling of `csgn`; `pow(a, b)` parses to the
/// `^` operator and has no entry here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Sqrt,
    Abs,
    /// Sign: -1, 0 or 1 (of the real part, or the imaginary part when the
    /// real part is zero).
    Csgn,
    /// Truncation toward zero.
    Floor,
    /// `x - floor(x / y) * y`.
    Mod,
    /// 1 if the arguments are equal, else 0.
    Equal,
    /// 1 if `x > y`, else 0.
    Gt,
    /// 1 if `x < y`, else 0.
    Lt,
    /// `ite(a, b, x, y)`: `x` if `a == b`, else `y`.
    Ite,
    /// Element of the owning module's `Vector`, 0 when out of range.
    Vector,
}

impl Builtin {
    pub const ALL: [Builtin; 22] = [
        Builtin::Sin,
        Builtin::Cos,
        Builtin::Tan,
        Builtin::Asin,
        Builtin::Acos,
        Builtin::Atan,
        Builtin::Atan2,
        Builtin::Sinh,
        Builtin::Cosh,
        Builtin::Tanh,
        Builtin::Exp,
        Builtin::Log,
        Builtin::Sqrt,
        Builtin::Abs,
        Builtin::Csgn,
        Builtin::Floor,
        Builtin::Mod,
        Builtin::Equal,
        Builtin::Gt,
        Builtin::Lt,
        Builtin::Ite,
        Builtin::Vector,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "step" {
            return Some(Builtin::Csgn);
        }
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Atan2 => "atan2",
            Builtin::Sinh => "sinh",
            Builtin::Cosh => "cosh",
            Builtin::Tanh => "tanh",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Csgn => "csgn",
            Builtin::Floor => "floor",
            Builtin::Mod => "mod",
            Builtin::Equal => "equal",
            Builtin::Gt => "gt",
            Builtin::Lt => "lt",
            Builtin::Ite => "ite",
            Builtin::Vector => "Vector",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Atan2 | Builtin::Mod | Builtin::Equal | Builtin::Gt | Builtin::Lt => 2,
            Builtin::Ite => 4,
            _ => 1,
        }
    }

    /// Functions whose value is piecewise constant in every argument.
    pub fn is_step_like(self) -> bool {
        matches!(
            self,
            Builtin::Csgn
                | Builtin::Floor
                | Builtin::Equal
                | Builtin::Gt
                | Builtin::Lt
                | Builtin::Vector
        )
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
