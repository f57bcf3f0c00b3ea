//! Object descriptors and metadata walks.

use crate::error::{Error, MetadataErrorKind, Result};
use crate::field::MetaField;
use crate::object::Object;
use crate::types::TypeKey;
use crate::validate;
use crate::value::Value;
use std::sync::Arc;

/// Visits each field of an object for mutation (decoders, row binders).
pub trait FieldVisitor {
    fn visit_field(&mut self, object: &mut dyn Object, field: &MetaField) -> Result<()>;
}

/// Visits each field of an object read-only (encoders).
pub trait FieldInspector {
    fn inspect_field(&mut self, object: &dyn Object, field: &MetaField) -> Result<()>;
}

fn create<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

/// Runtime description of a record type.
///
/// Fields are ordered: inherited fields first, then own fields in
/// declaration order. That order is the default column and key order.
pub struct MetaObject {
    name: &'static str,
    table: &'static str,
    type_key: TypeKey,
    size: usize,
    super_object: Option<Arc<MetaObject>>,
    fields: Vec<MetaField>,
    own_start: usize,
    factory: fn() -> Box<dyn Object>,
}

impl MetaObject {
    pub fn builder<T: Object + Default>(name: &'static str) -> MetaObjectBuilder<T> {
        MetaObjectBuilder {
            name,
            table: None,
            super_object: None,
            fields: Vec::new(),
            own_start: 0,
            _owner: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Table the object is stored in; the object name unless overridden.
    pub fn table_name(&self) -> &'static str {
        self.table
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn super_object(&self) -> Option<&Arc<MetaObject>> {
        self.super_object.as_ref()
    }

    /// All fields, inherited first.
    pub fn fields(&self) -> &[MetaField] {
        &self.fields
    }

    pub fn own_fields(&self) -> &[MetaField] {
        &self.fields[self.own_start..]
    }

    /// Fields that map onto SQL columns.
    pub fn columns(&self) -> impl Iterator<Item = &MetaField> {
        self.fields.iter().filter(|f| f.is_column())
    }

    pub fn field_by_name(&self, name: &str, case_sensitive: bool) -> Option<&MetaField> {
        if case_sensitive {
            self.fields.iter().find(|f| f.name() == name)
        } else {
            self.fields
                .iter()
                .find(|f| f.name().eq_ignore_ascii_case(name))
        }
    }

    pub fn primary_key(&self) -> Option<&MetaField> {
        self.fields.iter().find(|f| f.is_primary_key())
    }

    pub fn create_instance(&self) -> Box<dyn Object> {
        (self.factory)()
    }

    /// Function creating default instances of the described type.
    pub fn factory(&self) -> fn() -> Box<dyn Object> {
        self.factory
    }

    pub fn is_instance(&self, object: &dyn Object) -> bool {
        object.as_any().type_id() == self.type_key.id
    }

    /// Walk every field of `object` for mutation.
    pub fn visit(&self, object: &mut dyn Object, visitor: &mut dyn FieldVisitor) -> Result<()> {
        for field in &self.fields {
            visitor.visit_field(object, field)?;
        }
        Ok(())
    }

    /// Walk every field of `object` read-only.
    pub fn inspect(&self, object: &dyn Object, inspector: &mut dyn FieldInspector) -> Result<()> {
        for field in &self.fields {
            inspector.inspect_field(object, field)?;
        }
        Ok(())
    }

    /// Create an instance from named values; fields not named are resolved
    /// by their mandatoriness.
    pub fn construct(&self, values: &[(&str, Value)]) -> Result<Box<dyn Object>> {
        let mut object = self.create_instance();
        for field in &self.fields {
            match values.iter().find(|(name, _)| *name == field.name()) {
                Some((_, value)) => field.set(object.as_mut(), value.clone())?,
                None => field.resolve_absent(object.as_mut())?,
            }
        }
        Ok(object)
    }
}

impl std::fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaObject")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("size", &self.size)
            .field("super", &self.super_object.as_ref().map(|s| s.name))
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MetaObject`]; validation happens in [`build`](Self::build).
pub struct MetaObjectBuilder<T> {
    name: &'static str,
    table: Option<&'static str>,
    super_object: Option<Arc<MetaObject>>,
    fields: Vec<MetaField>,
    own_start: usize,
    _owner: std::marker::PhantomData<fn() -> T>,
}

impl<T: Object + Default> MetaObjectBuilder<T> {
    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    /// Inherit the fields of `base`, which `T` embeds at `base_offset`.
    ///
    /// Must precede the own fields.
    pub fn extends<B: Object>(
        mut self,
        base: &Arc<MetaObject>,
        base_offset: usize,
        project: fn(&T) -> &B,
        project_mut: fn(&mut T) -> &mut B,
    ) -> Result<Self> {
        if base.type_key.id != TypeKey::of::<B>().id {
            return Err(Error::metadata(
                MetadataErrorKind::SuperMismatch,
                format!(
                    "{} describes {}, not {}",
                    base.name,
                    base.type_key.rust_name,
                    std::any::type_name::<B>()
                ),
            ));
        }
        if !self.fields.is_empty() {
            return Err(Error::metadata(
                MetadataErrorKind::SuperMismatch,
                format!("{} must declare its super type before its fields", self.name),
            ));
        }
        self.fields = base
            .fields
            .iter()
            .map(|f| f.rebase(base_offset, project, project_mut))
            .collect();
        self.own_start = self.fields.len();
        self.super_object = Some(Arc::clone(base));
        Ok(self)
    }

    pub fn field(mut self, field: MetaField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<MetaObject> {
        let size = std::mem::size_of::<T>();
        let table = self.table.unwrap_or(self.name);
        for name in [self.name, table] {
            if !validate::is_identifier(name) {
                return Err(Error::metadata(
                    MetadataErrorKind::InvalidName,
                    format!("'{}' is not a valid identifier", name),
                ));
            }
        }

        for (index, field) in self.fields.iter().enumerate() {
            if field.owner().id != TypeKey::of::<T>().id {
                return Err(Error::metadata(
                    MetadataErrorKind::UnknownReference,
                    format!(
                        "field '{}' is bound to {}, not to {}",
                        field.name(),
                        field.owner().rust_name,
                        self.name
                    ),
                ));
            }
            check_field(self.name, size, field)?;
            if self.fields[..index].iter().any(|f| f.name() == field.name()) {
                return Err(Error::metadata(
                    MetadataErrorKind::DuplicateField,
                    format!("{} declares field '{}' twice", self.name, field.name()),
                ));
            }
        }

        tracing::debug!(
            object = self.name,
            fields = self.fields.len(),
            inherited = self.own_start,
            "Built object metadata"
        );

        Ok(MetaObject {
            name: self.name,
            table,
            type_key: TypeKey::of::<T>(),
            size,
            super_object: self.super_object,
            fields: self.fields,
            own_start: self.own_start,
            factory: create::<T>,
        })
    }
}

fn check_field(owner: &str, owner_size: usize, field: &MetaField) -> Result<()> {
    let fail = |kind, message: String| Err(Error::metadata(kind, message));

    if !validate::is_identifier(field.name()) {
        return fail(
            MetadataErrorKind::InvalidName,
            format!("{}.{} is not a valid identifier", owner, field.name()),
        );
    }
    if field.offset() + field.size() > owner_size {
        return fail(
            MetadataErrorKind::Layout,
            format!(
                "{}.{} at offset {} with size {} exceeds object size {}",
                owner,
                field.name(),
                field.offset(),
                field.size(),
                owner_size
            ),
        );
    }
    if field.nullable_depth() > 1 {
        return fail(
            MetadataErrorKind::NestedNullable,
            format!("{}.{} is a nullable of a nullable", owner, field.name()),
        );
    }
    if field.array_info().is_some_and(|a| a.element_nullable > 1) {
        return fail(
            MetadataErrorKind::NestedNullable,
            format!("{}.{} holds nullables of nullables", owner, field.name()),
        );
    }
    if let Some(default) = field.explicit_default() {
        let compatible = match default.field_type() {
            None => field.is_nullable(),
            Some(t) => {
                t == field.field_type()
                    || (t == crate::types::FieldType::Uint32 && field.enum_descriptor().is_some())
            }
        };
        if !compatible {
            return fail(
                MetadataErrorKind::DefaultMismatch,
                format!(
                    "{}.{} is {} but its default is {}",
                    owner,
                    field.name(),
                    field.field_type(),
                    default.kind_name()
                ),
            );
        }
        if let (Value::Enum(v), Some(descriptor)) = (default, field.enum_descriptor()) {
            if !descriptor.contains(*v) {
                return fail(
                    MetadataErrorKind::DefaultMismatch,
                    format!(
                        "{}.{} default {} is not a value of {}",
                        owner,
                        field.name(),
                        v,
                        descriptor.name
                    ),
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTime;
    use crate::error::{DataErrorKind, UsageErrorKind};
    use crate::nullable::Nullable;
    use crate::types::FieldType;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Entity {
        id: u64,
        created: DateTime,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        base: Entity,
        name: String,
        age: Nullable<i32>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Broken {
        value: Nullable<Nullable<i32>>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Holder {
        inner: Broken,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Series {
        samples: Vec<Nullable<i32>>,
        deep: Vec<Nullable<Nullable<i32>>>,
    }

    crate::impl_object!(Entity, Person, Broken, Holder, Series);

    fn entity_meta() -> Arc<MetaObject> {
        Arc::new(
            MetaObject::builder::<Entity>("Entity")
                .field(crate::meta_field!(Entity, id).primary_key(true).auto_increment(true))
                .field(crate::meta_field!(Entity, created))
                .build()
                .unwrap(),
        )
    }

    fn person_meta(base: &Arc<MetaObject>) -> MetaObject {
        MetaObject::builder::<Person>("Person")
            .table("people")
            .extends(
                base,
                std::mem::offset_of!(Person, base),
                |p: &Person| &p.base,
                |p: &mut Person| &mut p.base,
            )
            .unwrap()
            .field(crate::meta_field!(Person, name).required())
            .field(crate::meta_field!(Person, age))
            .build()
            .unwrap()
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let base = entity_meta();
        let meta = person_meta(&base);
        let names: Vec<_> = meta.fields().iter().map(MetaField::name).collect();
        assert_eq!(names, ["id", "created", "name", "age"]);
        assert_eq!(meta.own_fields().len(), 2);
        assert_eq!(meta.super_object().map(|s| s.name()), Some("Entity"));
        assert_eq!(meta.table_name(), "people");
        assert_eq!(meta.primary_key().map(MetaField::name), Some("id"));
    }

    #[test]
    fn test_inherited_accessors_reach_embedded_base() {
        let base = entity_meta();
        let meta = person_meta(&base);
        let mut person = Person::default();
        let id = meta.field_by_name("ID", false).unwrap();
        id.set(&mut person, Value::Uint64(9)).unwrap();
        assert_eq!(person.base.id, 9);
        assert_eq!(id.get(&person).unwrap(), Value::Uint64(9));
        assert!(meta.field_by_name("ID", true).is_none());

        // the base descriptor still applies to the base type only
        let err = base.fields()[0].get(&person).unwrap_err();
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::ObjectMismatch));
    }

    #[test]
    fn test_layout_invariant_holds() {
        let base = entity_meta();
        let meta = person_meta(&base);
        for field in meta.fields() {
            assert!(field.offset() + field.size() <= meta.size(), "{}", field.name());
        }
    }

    #[test]
    fn test_construct_resolves_absent_fields() {
        let base = entity_meta();
        let meta = person_meta(&base);
        let object = meta.construct(&[("name", Value::from("Ada"))]).unwrap();
        let person = object.downcast_ref::<Person>().unwrap();
        assert_eq!(person.name, "Ada");
        assert!(!person.age.is_set());

        let err = meta.construct(&[]).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::MissingField));
    }

    #[test]
    fn test_nested_nullable_rejected() {
        let err = MetaObject::builder::<Broken>("Broken")
            .field(crate::meta_field!(Broken, value))
            .build()
            .unwrap_err();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::NestedNullable));
    }

    #[test]
    fn test_array_elements_may_be_nullable_once() {
        let meta = MetaObject::builder::<Series>("Series")
            .field(crate::meta_field!(Series, samples))
            .build()
            .unwrap();
        let samples = meta.field_by_name("samples", true).unwrap();
        assert_eq!(samples.array_info().map(|a| a.element_nullable), Some(1));

        let mut series = Series::default();
        let values = Value::Array(vec![Value::Int32(3), Value::Null]);
        samples.set(&mut series, values.clone()).unwrap();
        assert_eq!(series.samples, vec![Nullable::new(3), Nullable::null()]);
        assert_eq!(samples.get(&series).unwrap(), values);

        let err = MetaObject::builder::<Series>("Series")
            .field(crate::meta_field!(Series, deep))
            .build()
            .unwrap_err();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::NestedNullable));
    }

    #[test]
    fn test_duplicate_and_invalid_names_rejected() {
        let err = MetaObject::builder::<Entity>("Entity")
            .field(crate::meta_field!(Entity, id))
            .field(crate::meta_field!(Entity, id))
            .build()
            .unwrap_err();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::DuplicateField));

        let err = MetaObject::builder::<Entity>("Bad Name").build().unwrap_err();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::InvalidName));
    }

    #[test]
    fn test_default_must_match_type() {
        let err = MetaObject::builder::<Person>("Person")
            .field(crate::meta_field!(Person, name).default_value(5i32))
            .build()
            .unwrap_err();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::DefaultMismatch));
    }

    #[test]
    fn test_extends_checks_base_type() {
        let base = entity_meta();
        let err = MetaObject::builder::<Holder>("Holder")
            .extends(
                &base,
                0,
                |h: &Holder| &h.inner,
                |h: &mut Holder| &mut h.inner,
            )
            .err()
            .unwrap();
        assert_eq!(err.metadata_kind(), Some(MetadataErrorKind::SuperMismatch));
    }

    #[test]
    fn test_columns_skip_structured_fields() {
        let base = entity_meta();
        let meta = person_meta(&base);
        assert!(meta.columns().all(|f| f.field_type() != FieldType::Array));
        assert_eq!(meta.columns().count(), 4);
    }
}
