//! Optional field values with retained storage.

use crate::enums::EnumDescriptor;
use crate::error::{Error, Result, UsageErrorKind};
use crate::types::{ArrayInfo, FieldType, FieldValue, TypeKey};
use crate::value::Value;

/// A field value that may be unset.
///
/// Unlike `Option`, the storage survives clearing: `reset(false)` only drops
/// the has-value flag and `reset(true)` marks the retained value as set again.
#[derive(Debug, Clone, Default)]
pub struct Nullable<T> {
    is_set: bool,
    value: T,
}

impl<T> Nullable<T> {
    pub fn new(value: T) -> Self {
        Self {
            is_set: true,
            value,
        }
    }

    pub const fn is_set(&self) -> bool {
        self.is_set
    }

    /// Borrow the value, failing when unset.
    pub fn get(&self) -> Result<&T> {
        if self.is_set {
            Ok(&self.value)
        } else {
            Err(Error::usage(
                UsageErrorKind::UnsetNullable,
                "read of an unset nullable value",
            ))
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        if self.is_set {
            Ok(&mut self.value)
        } else {
            Err(Error::usage(
                UsageErrorKind::UnsetNullable,
                "write through an unset nullable value",
            ))
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        self.is_set.then_some(&self.value)
    }

    /// Assign a value; always marks the nullable as set.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.is_set = true;
    }

    pub fn reset(&mut self, is_set: bool) {
        self.is_set = is_set;
    }
}

impl<T: Clone> Nullable<T> {
    /// The value, or `fallback` when unset.
    pub fn value_or(&self, fallback: T) -> T {
        if self.is_set {
            self.value.clone()
        } else {
            fallback
        }
    }
}

impl<T: Default> Nullable<T> {
    /// An unset nullable with default storage.
    pub fn null() -> Self {
        Self::default()
    }
}

impl<T: PartialEq> PartialEq for Nullable<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_set, other.is_set) {
            (true, true) => self.value == other.value,
            (false, false) => true,
            _ => false,
        }
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Self {
        Nullable::new(value)
    }
}

impl<T: Default> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Nullable::default, Nullable::new)
    }
}

impl From<&str> for Nullable<String> {
    fn from(value: &str) -> Self {
        Nullable::new(value.to_string())
    }
}

impl<T: FieldValue> FieldValue for Nullable<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;

    fn nullable_depth() -> u8 {
        T::nullable_depth() + 1
    }

    fn enum_descriptor() -> Option<&'static EnumDescriptor> {
        T::enum_descriptor()
    }

    fn object_type() -> Option<TypeKey> {
        T::object_type()
    }

    fn array_info() -> Option<ArrayInfo> {
        T::array_info()
    }

    fn to_value(&self) -> Value {
        if self.is_set {
            self.value.to_value()
        } else {
            Value::Null
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(Nullable::null())
        } else {
            T::from_value(value).map(Nullable::new)
        }
    }
}
