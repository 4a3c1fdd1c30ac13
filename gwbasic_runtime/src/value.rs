//! Scalar value representation.
//!
//! Four variants cover the whole dialect: 16-bit integers, single and double
//! floats, and heap-descriptor strings. Every value carries its tag;
//! nothing in the runtime stores untagged scalars.

use crate::error::{BasicError, BasicResult};
use crate::strings::StrDesc;

/// Type tag shared by scalars, array elements and the DEF default table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int16,
    Single,
    Double,
    Str,
}

impl ScalarType {
    /// Type named by a trailing sigil: `%` `!` `#` `$`.
    pub fn from_suffix(suffix: char) -> Option<ScalarType> {
        match suffix {
            '%' => Some(ScalarType::Int16),
            '!' => Some(ScalarType::Single),
            '#' => Some(ScalarType::Double),
            '$' => Some(ScalarType::Str),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarType::Str)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Int16 => "Integer",
            ScalarType::Single => "Single",
            ScalarType::Double => "Double",
            ScalarType::Str => "String",
        }
    }
}

/// What happens when a value is narrowed to Int16 and does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowMode {
    /// Raise error 6.
    #[default]
    Strict,
    /// Clamp to the Int16 range.
    Saturating,
}

#[derive(Debug, Clone)]
pub enum Value {
    Int16(i16),
    Single(f32),
    Double(f64),
    Str(StrDesc),
}

impl Value {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Int16(_) => ScalarType::Int16,
            Value::Single(_) => ScalarType::Single,
            Value::Double(_) => ScalarType::Double,
            Value::Str(_) => ScalarType::Str,
        }
    }

    /// The zero value a fresh slot of the given type starts with.
    pub fn default_for(ty: ScalarType) -> Value {
        match ty {
            ScalarType::Int16 => Value::Int16(0),
            ScalarType::Single => Value::Single(0.0),
            ScalarType::Double => Value::Double(0.0),
            ScalarType::Str => Value::Str(StrDesc::empty()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.scalar_type().is_numeric()
    }

    pub fn as_double(&self) -> BasicResult<f64> {
        match self {
            Value::Int16(v) => Ok(*v as f64),
            Value::Single(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Str(_) => Err(BasicError::TypeMismatch),
        }
    }

    /// Truncating narrow to Int16 under the given overflow mode.
    pub fn as_int16(&self, mode: OverflowMode) -> BasicResult<i16> {
        match self {
            Value::Int16(v) => Ok(*v),
            other => narrow_to_int16(other.as_double()?, mode),
        }
    }

    /// Zero and the empty string are false; everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int16(v) => *v != 0,
            Value::Single(v) => *v != 0.0,
            Value::Double(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Dialect boolean: false is 0, true is -1 (all bits set).
    pub fn to_bool_int16(&self) -> i16 {
        if self.truthy() {
            -1
        } else {
            0
        }
    }

    /// Convert between numeric types; strings pass through unchanged to a
    /// Str target and mismatch otherwise.
    pub fn coerce_numeric(&self, ty: ScalarType, mode: OverflowMode) -> BasicResult<Value> {
        match (self, ty) {
            (Value::Str(s), ScalarType::Str) => Ok(Value::Str(s.clone())),
            (Value::Str(_), _) | (_, ScalarType::Str) => Err(BasicError::TypeMismatch),
            (v, ScalarType::Int16) => Ok(Value::Int16(v.as_int16(mode)?)),
            (v, ScalarType::Single) => Ok(Value::Single(v.as_double()? as f32)),
            (v, ScalarType::Double) => Ok(Value::Double(v.as_double()?)),
        }
    }
}

/// Truncate toward zero and narrow, honoring the overflow mode.
pub fn narrow_to_int16(value: f64, mode: OverflowMode) -> BasicResult<i16> {
    let t = value.trunc();
    if t > i16::MAX as f64 || t < i16::MIN as f64 {
        match mode {
            OverflowMode::Strict => Err(BasicError::Overflow),
            OverflowMode::Saturating => Ok(if t > 0.0 { i16::MAX } else { i16::MIN }),
        }
    } else {
        Ok(t as i16)
    }
}
