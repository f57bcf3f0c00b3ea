//! The `Object` trait implemented by every described record type.

use crate::error::{DataErrorKind, Error, Result};
use crate::types::{FieldType, FieldValue, mismatch};
use crate::value::Value;
use std::any::Any;
use std::fmt;

/// A record type whose layout is described by a `MetaObject`.
///
/// Implemented with [`impl_object!`](crate::impl_object); the methods give
/// type-erased access for accessors, factories and polymorphic fields.
pub trait Object: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_object(&self) -> Box<dyn Object>;

    fn eq_object(&self, other: &dyn Object) -> bool;
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

impl PartialEq for dyn Object {
    fn eq(&self, other: &Self) -> bool {
        self.eq_object(other)
    }
}

impl dyn Object {
    pub fn is<T: Object>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Implement [`Object`] and [`FieldValue`](crate::types::FieldValue) for a
/// record type so it can be registered and nested in other objects.
///
/// The type must be `Debug + Clone + PartialEq + Default + Send + Sync + 'static`.
#[macro_export]
macro_rules! impl_object {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::object::Object for $ty {
                fn as_any(&self) -> &dyn ::core::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                    self
                }

                fn into_any(
                    self: ::std::boxed::Box<Self>,
                ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                    self
                }

                fn clone_object(&self) -> ::std::boxed::Box<dyn $crate::object::Object> {
                    ::std::boxed::Box::new(::core::clone::Clone::clone(self))
                }

                fn eq_object(&self, other: &dyn $crate::object::Object) -> bool {
                    other
                        .as_any()
                        .downcast_ref::<$ty>()
                        .is_some_and(|other| self == other)
                }
            }

            impl $crate::types::FieldValue for $ty {
                const FIELD_TYPE: $crate::types::FieldType = $crate::types::FieldType::Object;

                fn object_type() -> ::core::option::Option<$crate::types::TypeKey> {
                    ::core::option::Option::Some($crate::types::TypeKey::of::<$ty>())
                }

                fn to_value(&self) -> $crate::value::Value {
                    $crate::value::Value::Object(::std::boxed::Box::new(
                        ::core::clone::Clone::clone(self),
                    ))
                }

                fn from_value(value: $crate::value::Value) -> $crate::error::Result<Self> {
                    $crate::object::object_from_value::<$ty>(value)
                }
            }
        )+
    };
}

#[doc(hidden)]
pub fn object_from_value<T: Object>(value: Value) -> Result<T> {
    match value {
        Value::Object(object) => object.into_any().downcast::<T>().map(|b| *b).map_err(|_| {
            Error::data(
                DataErrorKind::TypeMismatch(FieldType::Object),
                format!("object is not a {}", std::any::type_name::<T>()),
            )
        }),
        other => Err(mismatch(FieldType::Object, &other)),
    }
}

/// A polymorphic field: holds any registered object, or nothing.
///
/// Serializers tag the contained object with its registered type name.
#[derive(Debug, Clone, Default)]
pub struct Variant(Option<Box<dyn Object>>);

impl Variant {
    pub fn new<T: Object>(object: T) -> Self {
        Variant(Some(Box::new(object)))
    }

    pub fn from_box(object: Box<dyn Object>) -> Self {
        Variant(Some(object))
    }

    pub fn empty() -> Self {
        Variant(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&dyn Object> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut (dyn Object + 'static)> {
        self.0.as_deref_mut()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.get().and_then(|o| o.downcast_ref::<T>())
    }

    pub fn take(&mut self) -> Option<Box<dyn Object>> {
        self.0.take()
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.eq_object(b.as_ref()),
            (None, None) => true,
            _ => false,
        }
    }
}

impl FieldValue for Variant {
    const FIELD_TYPE: FieldType = FieldType::Variant;

    fn to_value(&self) -> Value {
        self.0.clone().map_or(Value::Null, Value::Object)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Variant(None)),
            Value::Object(object) => Ok(Variant(Some(object))),
            other => Err(mismatch(FieldType::Variant, &other)),
        }
    }
}
