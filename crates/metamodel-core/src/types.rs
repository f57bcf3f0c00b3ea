//! Field type tags and the `FieldValue` trait mapping Rust types onto them.

use crate::datetime::DateTime;
use crate::enums::EnumDescriptor;
use crate::error::{DataErrorKind, Error, Result};
use crate::value::Value;
use std::any::TypeId;
use std::fmt;

/// Runtime type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    String,
    Enum,
    DateTime,
    /// Nested registered object
    Object,
    /// Homogeneous sequence
    Array,
    /// Polymorphic object resolved through a type discriminant
    Variant,
}

impl FieldType {
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Uint32 | FieldType::Int64 | FieldType::Uint64
        )
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, FieldType::Float | FieldType::Double)
    }

    /// Whether values of this type map onto a single SQL column.
    pub const fn is_column(self) -> bool {
        !matches!(
            self,
            FieldType::Object | FieldType::Array | FieldType::Variant
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int32 => "int32",
            FieldType::Uint32 => "uint32",
            FieldType::Int64 => "int64",
            FieldType::Uint64 => "uint64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Enum => "enum",
            FieldType::DateTime => "datetime",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Variant => "variant",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a Rust type registered as an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub id: TypeId,
    pub rust_name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
        }
    }
}

/// Element description of an array field.
#[derive(Debug, Clone, Copy)]
pub struct ArrayInfo {
    pub element_type: FieldType,
    pub element_size: usize,
    pub element_object: Option<TypeKey>,
    pub element_enum: Option<&'static EnumDescriptor>,
    /// Nullability depth of the element type
    pub element_nullable: u8,
}

/// A Rust type that can be stored in a described field.
///
/// Conversions through [`Value`] are strict: `from_value` accepts only the
/// variant produced by `to_value` (plus `Null` for nullable types). The
/// `Default` value is the field's zero value.
pub trait FieldValue: Sized + Default + Send + Sync + 'static {
    const FIELD_TYPE: FieldType;

    /// Levels of `Nullable` wrapping this type.
    fn nullable_depth() -> u8 {
        0
    }

    fn enum_descriptor() -> Option<&'static EnumDescriptor> {
        None
    }

    fn object_type() -> Option<TypeKey> {
        None
    }

    fn array_info() -> Option<ArrayInfo> {
        None
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

pub(crate) fn mismatch(expected: FieldType, found: &Value) -> Error {
    Error::data(
        DataErrorKind::TypeMismatch(expected),
        format!("expected {}, found {}", expected, found.kind_name()),
    )
}

macro_rules! scalar_field_value {
    ($($ty:ty => $tag:ident),+ $(,)?) => {
        $(
            impl FieldValue for $ty {
                const FIELD_TYPE: FieldType = FieldType::$tag;

                fn to_value(&self) -> Value {
                    Value::$tag(self.clone())
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$tag(v) => Ok(v),
                        other => Err(mismatch(FieldType::$tag, &other)),
                    }
                }
            }
        )+
    };
}

scalar_field_value! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime => DateTime,
}

// u32 doubles as the storage of bitset fields described with an enum
// descriptor, so it also accepts enum values.
impl FieldValue for u32 {
    const FIELD_TYPE: FieldType = FieldType::Uint32;

    fn to_value(&self) -> Value {
        Value::Uint32(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uint32(v) | Value::Enum(v) => Ok(v),
            other => Err(mismatch(FieldType::Uint32, &other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const FIELD_TYPE: FieldType = FieldType::Array;

    fn array_info() -> Option<ArrayInfo> {
        Some(ArrayInfo {
            element_type: T::FIELD_TYPE,
            element_size: std::mem::size_of::<T>(),
            element_object: T::object_type(),
            element_enum: T::enum_descriptor(),
            element_nullable: T::nullable_depth(),
        })
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(FieldType::Array, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions_are_strict() {
        assert_eq!(i32::from_value(Value::Int32(-7)).unwrap(), -7);
        let err = i32::from_value(Value::Int64(7)).unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::TypeMismatch(FieldType::Int32))
        );
        assert!(String::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_u32_accepts_enum_bits() {
        assert_eq!(u32::from_value(Value::Enum(5)).unwrap(), 5);
        assert_eq!(5u32.to_value(), Value::Uint32(5));
    }

    #[test]
    fn test_vec_array_info() {
        let info = Vec::<i64>::array_info().unwrap();
        assert_eq!(info.element_type, FieldType::Int64);
        assert_eq!(info.element_size, 8);
        assert!(info.element_object.is_none());
        let v = vec![1i64, 2, 3];
        assert_eq!(Vec::<i64>::from_value(v.to_value()).unwrap(), v);
    }

    #[test]
    fn test_column_types() {
        assert!(FieldType::DateTime.is_column());
        assert!(!FieldType::Array.is_column());
        assert!(FieldType::Uint64.is_integer());
        assert!(FieldType::Float.is_floating());
    }
}
