//! Typed attribute values.
//!
//! Every attribute holds exactly one [`Value`]. Its [`ValueKind`] is fixed
//! when the attribute is declared; formulas produce numbers that are cast to
//! that kind the way a C assignment would.

use std::fmt;

/// Axis a pulse acts on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PulseAxis {
    Rf,
    Gx,
    Gy,
    Gz,
    #[default]
    Void,
}

impl PulseAxis {
    pub const ALL: [PulseAxis; 5] = [
        PulseAxis::Rf,
        PulseAxis::Gx,
        PulseAxis::Gy,
        PulseAxis::Gz,
        PulseAxis::Void,
    ];

    /// `RF`, `GX`, `GY`, `GZ`; anything else is [`PulseAxis::Void`].
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "RF" => PulseAxis::Rf,
            "GX" => PulseAxis::Gx,
            "GY" => PulseAxis::Gy,
            "GZ" => PulseAxis::Gz,
            _ => PulseAxis::Void,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PulseAxis::Rf => "RF",
            PulseAxis::Gx => "GX",
            PulseAxis::Gy => "GY",
            PulseAxis::Gz => "GZ",
            PulseAxis::Void => "VOID",
        }
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Out-of-range indices map to [`PulseAxis::Void`].
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(PulseAxis::Void)
    }
}

impl fmt::Display for PulseAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type tag of an attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Double,
    Int,
    Long,
    UInt,
    Bool,
    Str,
    Enum,
}

impl ValueKind {
    /// Kinds a formula result can be written to.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ValueKind::Str)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Double => "double",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::UInt => "unsigned",
            ValueKind::Bool => "bool",
            ValueKind::Str => "string",
            ValueKind::Enum => "enum",
        })
    }
}

/// The value of one attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Double(f64),
    Int(i32),
    Long(i64),
    UInt(u32),
    Bool(bool),
    Str(String),
    Enum(PulseAxis),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Double(_) => ValueKind::Double,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::UInt(_) => ValueKind::UInt,
            Value::Bool(_) => ValueKind::Bool,
            Value::Str(_) => ValueKind::Str,
            Value::Enum(_) => ValueKind::Enum,
        }
    }

    /// Numeric view used when the value is a formula subject.
    ///
    /// Booleans read as 1/0 and enums as their index; strings have none.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            Value::Int(x) => Some(f64::from(*x)),
            Value::Long(x) => Some(*x as f64),
            Value::UInt(x) => Some(f64::from(*x)),
            Value::Bool(x) => Some(if *x { 1.0 } else { 0.0 }),
            Value::Str(_) => None,
            Value::Enum(axis) => Some(f64::from(axis.index())),
        }
    }

    /// Cast a formula result to `kind`.
    ///
    /// Integer kinds truncate toward zero and saturate; NaN becomes 0.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(kind: ValueKind, x: f64) -> Self {
        match kind {
            ValueKind::Double => Value::Double(x),
            ValueKind::Int => Value::Int(x as i32),
            ValueKind::Long => Value::Long(x as i64),
            ValueKind::UInt => Value::UInt(x as u32),
            ValueKind::Bool => Value::Bool(x != 0.0),
            ValueKind::Str => Value::Str(x.to_string()),
            ValueKind::Enum => Value::Enum(PulseAxis::from_index(x as i64)),
        }
    }

    /// Parse configuration text as a plain literal of `kind`.
    ///
    /// Returns `None` when the text is not a literal, in which case callers
    /// try it as a constant formula.
    pub fn parse_literal(kind: ValueKind, text: &str) -> Option<Self> {
        let trimmed = text.trim();
        match kind {
            ValueKind::Double => trimmed.parse().ok().map(Value::Double),
            ValueKind::Int => trimmed.parse().ok().map(Value::Int),
            ValueKind::Long => trimmed.parse().ok().map(Value::Long),
            ValueKind::UInt => trimmed.parse().ok().map(Value::UInt),
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueKind::Str => Some(Value::Str(text.to_owned())),
            ValueKind::Enum => Some(Value::Enum(PulseAxis::from_name(trimmed))),
        }
    }

    /// Equality for change detection: NaN equals NaN.
    pub fn same_state(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(x) => write!(f, "{x}"),
            Value::Int(x) => write!(f, "{x}"),
            Value::Long(x) => write!(f, "{x}"),
            Value::UInt(x) => write!(f, "{x}"),
            Value::Bool(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Enum(axis) => write!(f, "{axis}"),
        }
    }
}

/// Rust types that map onto a [`ValueKind`], for the typed accessors.
pub trait AttrValue: Sized {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! attr_value {
    ($ty:ty, $kind:ident) => {
        impl AttrValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_value(self) -> Value {
                Value::$kind(self)
            }

            #[allow(clippy::clone_on_copy)]
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$kind(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

attr_value!(f64, Double);
attr_value!(i32, Int);
attr_value!(i64, Long);
attr_value!(u32, UInt);
attr_value!(bool, Bool);
attr_value!(String, Str);
attr_value!(PulseAxis, Enum);
