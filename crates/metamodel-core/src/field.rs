//! Field descriptors.

use crate::enums::EnumDescriptor;
use crate::error::{DataErrorKind, Error, Result, UsageErrorKind};
use crate::object::Object;
use crate::types::{ArrayInfo, FieldType, FieldValue, TypeKey};
use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// How an absent value is resolved when an object is filled from a source
/// that does not mention the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mandatoriness {
    /// Absence is an error.
    Required,
    /// Absence leaves the field untouched.
    #[default]
    Optional,
    /// Absence assigns the field's default.
    Defaultable,
}

type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Option<Result<()>> + Send + Sync>;

fn zero_of<F: FieldValue>() -> Value {
    F::default().to_value()
}

/// Description of one field of a record type.
///
/// Holds the type tag, nullability, layout (offset and size inside the owner),
/// mandatoriness and extension info, plus a typed get/set accessor pair bound
/// to the owning type. Built with [`meta_field!`](crate::meta_field).
#[derive(Clone)]
pub struct MetaField {
    name: &'static str,
    field_type: FieldType,
    nullable_depth: u8,
    offset: usize,
    size: usize,
    mandatoriness: Mandatoriness,
    default: Option<Value>,
    enum_descriptor: Option<&'static EnumDescriptor>,
    object_type: Option<TypeKey>,
    array: Option<ArrayInfo>,
    primary_key: bool,
    auto_increment: bool,
    owner: TypeKey,
    zero: fn() -> Value,
    getter: Getter,
    setter: Setter,
}

impl MetaField {
    /// Describe field `name` of `T` stored as an `F` at `offset`.
    pub fn bind<T: Object, F: FieldValue>(
        name: &'static str,
        offset: usize,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let field_type = F::FIELD_TYPE;
        let mandatoriness = match field_type {
            FieldType::Enum | FieldType::Array | FieldType::Object => Mandatoriness::Defaultable,
            _ => Mandatoriness::Optional,
        };
        Self {
            name,
            field_type,
            nullable_depth: F::nullable_depth(),
            offset,
            size: std::mem::size_of::<F>(),
            mandatoriness,
            default: None,
            enum_descriptor: F::enum_descriptor(),
            object_type: F::object_type(),
            array: F::array_info(),
            primary_key: false,
            auto_increment: false,
            owner: TypeKey::of::<T>(),
            zero: zero_of::<F>,
            getter: Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(|o| get(o).to_value())),
            setter: Arc::new(move |any: &mut dyn Any, value: Value| {
                let o = any.downcast_mut::<T>()?;
                Some(F::from_value(value).map(|v| *get_mut(o) = v))
            }),
        }
    }

    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    pub fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    pub fn mandatoriness(mut self, value: Mandatoriness) -> Self {
        self.mandatoriness = value;
        self
    }

    pub fn required(self) -> Self {
        self.mandatoriness(Mandatoriness::Required)
    }

    /// Set the default used for absent values; makes the field defaultable.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.mandatoriness = Mandatoriness::Defaultable;
        self
    }

    /// Describe a `u32` field as holding values of an enum or bitset.
    pub fn enumeration(mut self, descriptor: &'static EnumDescriptor) -> Self {
        self.enum_descriptor = Some(descriptor);
        if self.field_type == FieldType::Uint32 {
            self.field_type = FieldType::Enum;
            self.mandatoriness = Mandatoriness::Defaultable;
        }
        self
    }

    /// Re-home an inherited field onto a derived type `D`.
    pub(crate) fn rebase<D: Object, B: Object>(
        &self,
        base_offset: usize,
        project: fn(&D) -> &B,
        project_mut: fn(&mut D) -> &mut B,
    ) -> Self {
        let getter = Arc::clone(&self.getter);
        let setter = Arc::clone(&self.setter);
        Self {
            offset: base_offset + self.offset,
            owner: TypeKey::of::<D>(),
            getter: Arc::new(move |any: &dyn Any| {
                let d = any.downcast_ref::<D>()?;
                getter(project(d))
            }),
            setter: Arc::new(move |any: &mut dyn Any, value: Value| {
                let d = any.downcast_mut::<D>()?;
                setter(project_mut(d), value)
            }),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable_depth > 0
    }

    pub fn nullable_depth(&self) -> u8 {
        self.nullable_depth
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get_mandatoriness(&self) -> Mandatoriness {
        self.mandatoriness
    }

    pub fn explicit_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn enum_descriptor(&self) -> Option<&'static EnumDescriptor> {
        self.enum_descriptor
    }

    pub fn object_type(&self) -> Option<TypeKey> {
        self.object_type
    }

    pub fn array_info(&self) -> Option<&ArrayInfo> {
        self.array.as_ref()
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Whether the field maps onto a single SQL column.
    pub fn is_column(&self) -> bool {
        self.field_type.is_column()
    }

    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    fn mismatch(&self) -> Error {
        Error::usage(
            UsageErrorKind::ObjectMismatch,
            format!(
                "field '{}' belongs to {}, not to the given object",
                self.name, self.owner.rust_name
            ),
        )
    }

    /// Read the field of `object`.
    pub fn get(&self, object: &dyn Object) -> Result<Value> {
        let value = (self.getter)(object.as_any()).ok_or_else(|| self.mismatch())?;
        Ok(match value {
            Value::Uint32(bits) if self.field_type == FieldType::Enum => Value::Enum(bits),
            other => other,
        })
    }

    /// Assign the field of `object`.
    pub fn set(&self, object: &mut dyn Object, value: Value) -> Result<()> {
        if value.is_null() && !self.is_nullable() && self.field_type != FieldType::Variant {
            return Err(Error::data(
                DataErrorKind::IntegrityError,
                "NULL assigned to a non-nullable field",
            )
            .in_field(self.name));
        }
        (self.setter)(object.as_any_mut(), value)
            .ok_or_else(|| self.mismatch())?
            .map_err(|e| e.in_field(self.name))
    }

    /// Value assigned when a defaultable field is absent.
    pub fn default_for_absent(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        if !self.is_nullable() && self.field_type == FieldType::Enum {
            if let Some(descriptor) = self.enum_descriptor {
                return Value::Enum(descriptor.default);
            }
        }
        (self.zero)()
    }

    /// Resolve an absent value by mandatoriness.
    pub fn resolve_absent(&self, object: &mut dyn Object) -> Result<()> {
        match self.mandatoriness {
            Mandatoriness::Required => Err(Error::data(
                DataErrorKind::MissingField,
                "required field is absent",
            )
            .in_field(self.name)),
            Mandatoriness::Optional => Ok(()),
            Mandatoriness::Defaultable => self.set(object, self.default_for_absent()),
        }
    }
}

impl fmt::Debug for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaField")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("nullable_depth", &self.nullable_depth)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("mandatoriness", &self.mandatoriness)
            .field("default", &self.default)
            .field("enum", &self.enum_descriptor.map(|d| d.name))
            .field("primary_key", &self.primary_key)
            .field("auto_increment", &self.auto_increment)
            .finish_non_exhaustive()
    }
}

/// Build a [`MetaField`] for a named field of a struct, capturing its offset
/// and a typed accessor pair.
///
/// ```ignore
/// let id = meta_field!(Person, id).primary_key(true).auto_increment(true);
/// ```
#[macro_export]
macro_rules! meta_field {
    ($owner:ty, $field:ident) => {
        $crate::field::MetaField::bind::<$owner, _>(
            stringify!($field),
            ::core::mem::offset_of!($owner, $field),
            |o: &$owner| &o.$field,
            |o: &mut $owner| &mut o.$field,
        )
    };
}
