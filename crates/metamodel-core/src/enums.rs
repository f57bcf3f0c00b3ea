//! Enum descriptors and their textual forms.

use crate::error::{DataErrorKind, Error, Result};
use std::borrow::Cow;

/// Whether an enum holds one value or a union of bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Simple,
    Bitset,
}

/// Static description of an enum: its name, kind, default and ordered
/// `(name, value)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: &'static str,
    pub kind: EnumKind,
    pub default: u32,
    pub values: &'static [(&'static str, u32)],
}

impl EnumDescriptor {
    pub const fn new(
        name: &'static str,
        kind: EnumKind,
        default: u32,
        values: &'static [(&'static str, u32)],
    ) -> Self {
        Self {
            name,
            kind,
            default,
            values,
        }
    }

    pub fn name_of(&self, value: u32) -> Option<&'static str> {
        self.values.iter().find(|(_, v)| *v == value).map(|(n, _)| *n)
    }

    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Union of every registered bit.
    pub fn all_bits(&self) -> u32 {
        self.values.iter().fold(0, |acc, (_, v)| acc | v)
    }

    /// Whether `value` is representable: a registered value for simple enums,
    /// a union of registered bits for bitsets.
    pub fn contains(&self, value: u32) -> bool {
        match self.kind {
            EnumKind::Simple => self.name_of(value).is_some(),
            EnumKind::Bitset => value & !self.all_bits() == 0,
        }
    }

    pub fn check(&self, value: u32) -> Result<u32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(unknown_value(self, value))
        }
    }
}

fn unknown_value(descriptor: &EnumDescriptor, value: u32) -> Error {
    Error::data(
        DataErrorKind::UnknownEnumValue(value),
        format!("{} has no value {}", descriptor.name, value),
    )
}

fn unknown_name(descriptor: &EnumDescriptor, name: &str) -> Error {
    Error::data(
        DataErrorKind::UnknownEnumName(name.to_string()),
        format!("{} has no value named '{}'", descriptor.name, name),
    )
}

/// Render an enum value as text. Bitsets join the names of set flags with
/// `|` in declaration order.
pub fn enum_to_string(descriptor: &EnumDescriptor, value: u32) -> Result<Cow<'static, str>> {
    match descriptor.kind {
        EnumKind::Simple => descriptor
            .name_of(value)
            .map(Cow::Borrowed)
            .ok_or_else(|| unknown_value(descriptor, value)),
        EnumKind::Bitset => {
            if let Some(name) = descriptor.name_of(value) {
                return Ok(Cow::Borrowed(name));
            }
            let mut remaining = descriptor.check(value)?;
            let mut names = Vec::new();
            for (name, bits) in descriptor.values {
                if *bits != 0 && value & bits == *bits && remaining & bits != 0 {
                    names.push(*name);
                    remaining &= !bits;
                }
            }
            Ok(Cow::Owned(names.join("|")))
        }
    }
}

/// Parse the textual form produced by [`enum_to_string`].
pub fn enum_from_string(descriptor: &EnumDescriptor, text: &str) -> Result<u32> {
    match descriptor.kind {
        EnumKind::Simple => descriptor
            .value_of(text)
            .ok_or_else(|| unknown_name(descriptor, text)),
        EnumKind::Bitset => {
            if text.is_empty() {
                return Ok(0);
            }
            text.split('|').try_fold(0u32, |acc, part| {
                let part = part.trim();
                descriptor
                    .value_of(part)
                    .map(|bits| acc | bits)
                    .ok_or_else(|| unknown_name(descriptor, part))
            })
        }
    }
}

/// Declare a Rust enum together with its descriptor and field conversions.
///
/// ```ignore
/// meta_enum! {
///     pub enum Color: Simple, default = Red {
///         Red = 1,
///         Green = 2,
///     }
/// }
/// ```
#[macro_export]
macro_rules! meta_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident : $kind:ident, default = $default:ident {
            $($variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub fn descriptor() -> &'static $crate::enums::EnumDescriptor {
                static DESCRIPTOR: $crate::enums::EnumDescriptor =
                    $crate::enums::EnumDescriptor::new(
                        stringify!($name),
                        $crate::enums::EnumKind::$kind,
                        $name::$default as u32,
                        &[$((stringify!($variant), $value)),+],
                    );
                &DESCRIPTOR
            }

            pub fn from_u32(value: u32) -> ::core::option::Option<Self> {
                match value {
                    $(v if v == $value => ::core::option::Option::Some($name::$variant),)+
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $crate::types::FieldValue for $name {
            const FIELD_TYPE: $crate::types::FieldType = $crate::types::FieldType::Enum;

            fn enum_descriptor() -> ::core::option::Option<&'static $crate::enums::EnumDescriptor> {
                ::core::option::Option::Some($name::descriptor())
            }

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::Enum(*self as u32)
            }

            fn from_value(value: $crate::value::Value) -> $crate::error::Result<Self> {
                match value {
                    $crate::value::Value::Enum(n) | $crate::value::Value::Uint32(n) => {
                        $name::from_u32(n).ok_or_else(|| {
                            $crate::error::Error::data(
                                $crate::error::DataErrorKind::UnknownEnumValue(n),
                                format!("{} has no value {}", stringify!($name), n),
                            )
                        })
                    }
                    other => ::core::result::Result::Err($crate::error::Error::data(
                        $crate::error::DataErrorKind::TypeMismatch($crate::types::FieldType::Enum),
                        format!("expected enum, found {}", other.kind_name()),
                    )),
                }
            }
        }
    };
}
