//! Dynamic field values.

use crate::datetime::DateTime;
use crate::error::{DataErrorKind, Error, Result};
use crate::object::Object;
use crate::types::{FieldType, mismatch};

/// A dynamically-typed field value.
///
/// Values move between typed fields and the outside world: SQL parameters,
/// literals in expressions, fetched columns and tree-format nodes.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// Enum or bitset value
    Enum(u32),
    DateTime(DateTime),
    Object(Box<dyn Object>),
    Array(Vec<Value>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The field type this value carries, `None` for `Null`.
    ///
    /// Objects report [`FieldType::Object`]; variant fields share that shape.
    pub fn field_type(&self) -> Option<FieldType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => FieldType::Bool,
            Value::Int32(_) => FieldType::Int32,
            Value::Uint32(_) => FieldType::Uint32,
            Value::Int64(_) => FieldType::Int64,
            Value::Uint64(_) => FieldType::Uint64,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
            Value::String(_) => FieldType::String,
            Value::Enum(_) => FieldType::Enum,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Object(_) => FieldType::Object,
            Value::Array(_) => FieldType::Array,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        self.field_type().map_or("null", FieldType::name)
    }

    /// Integer view of any integral or enum value.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(i128::from(*b)),
            Value::Int32(v) => Some(i128::from(*v)),
            Value::Uint32(v) | Value::Enum(v) => Some(i128::from(*v)),
            Value::Int64(v) => Some(i128::from(*v)),
            Value::Uint64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Convert an integral value into another integral field type,
    /// failing when the target cannot represent it.
    pub fn coerce_integer(&self, target: FieldType) -> Result<Value> {
        let Some(n) = self.as_i128() else {
            return Err(mismatch(target, self));
        };
        let out_of_range = || {
            Error::data(
                DataErrorKind::TypeMismatch(target),
                format!("{} does not fit in {}", n, target),
            )
        };
        Ok(match target {
            FieldType::Int32 => Value::Int32(i32::try_from(n).map_err(|_| out_of_range())?),
            FieldType::Uint32 => Value::Uint32(u32::try_from(n).map_err(|_| out_of_range())?),
            FieldType::Int64 => Value::Int64(i64::try_from(n).map_err(|_| out_of_range())?),
            FieldType::Uint64 => Value::Uint64(u64::try_from(n).map_err(|_| out_of_range())?),
            FieldType::Enum => Value::Enum(u32::try_from(n).map_err(|_| out_of_range())?),
            _ => return Err(mismatch(target, self)),
        })
    }

    /// Zero value of a field type.
    pub fn zero(field_type: FieldType) -> Value {
        match field_type {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int32 => Value::Int32(0),
            FieldType::Uint32 => Value::Uint32(0),
            FieldType::Int64 => Value::Int64(0),
            FieldType::Uint64 => Value::Uint64(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::String => Value::String(String::new()),
            FieldType::Enum => Value::Enum(0),
            FieldType::DateTime => Value::DateTime(DateTime::default()),
            FieldType::Array => Value::Array(Vec::new()),
            FieldType::Object | FieldType::Variant => Value::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Uint32(a), Value::Uint32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.eq_object(b.as_ref()),
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_in_range() {
        let v = Value::Int64(42);
        assert_eq!(v.coerce_integer(FieldType::Uint64).unwrap(), Value::Uint64(42));
        assert_eq!(v.coerce_integer(FieldType::Int32).unwrap(), Value::Int32(42));
    }

    #[test]
    fn test_coerce_integer_out_of_range() {
        let err = Value::Int64(-1)
            .coerce_integer(FieldType::Uint32)
            .unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::TypeMismatch(FieldType::Uint32))
        );
        assert!(Value::String("1".into()).coerce_integer(FieldType::Int32).is_err());
    }

    #[test]
    fn test_equality_is_variant_strict() {
        assert_eq!(Value::from("a"), Value::String("a".to_string()));
        assert_ne!(Value::Int32(1), Value::Int64(1));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero(FieldType::Double), Value::Double(0.0));
        assert_eq!(Value::zero(FieldType::Array), Value::Array(Vec::new()));
        assert!(Value::zero(FieldType::Object).is_null());
    }
}
