//! The registry of object and enum descriptors.
//!
//! A [`Registry`] is assembled once by [`RegistryBuilder::build`], which checks
//! that every referenced type is present, and is read-only afterwards. It is
//! `Send + Sync` and can be shared freely between threads.

use crate::enums::EnumDescriptor;
use crate::error::{Error, MetadataErrorKind, Result, UsageErrorKind};
use crate::meta::MetaObject;
use crate::object::Object;
use crate::types::{FieldType, TypeKey};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates empty instances of polymorphic types from their registered names.
pub trait TypeResolver {
    fn create_instance(&self, type_name: &str) -> Option<Box<dyn Object>>;
}

#[derive(Debug, Default)]
pub struct Registry {
    objects: Vec<Arc<MetaObject>>,
    by_type: HashMap<TypeId, usize>,
    by_name: HashMap<&'static str, usize>,
    enums: HashMap<&'static str, &'static EnumDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn meta_of<T: Object>(&self) -> Result<&Arc<MetaObject>> {
        self.meta_by_type(TypeKey::of::<T>()).ok_or_else(|| {
            Error::usage(
                UsageErrorKind::UnregisteredType,
                format!("{} is not registered", std::any::type_name::<T>()),
            )
        })
    }

    /// Metadata of the dynamic type of `object`.
    pub fn meta_for(&self, object: &dyn Object) -> Result<&Arc<MetaObject>> {
        self.by_type
            .get(&object.as_any().type_id())
            .map(|&i| &self.objects[i])
            .ok_or_else(|| {
                Error::usage(
                    UsageErrorKind::UnregisteredType,
                    format!("{:?} has no registered metadata", object),
                )
            })
    }

    pub fn meta_by_type(&self, key: TypeKey) -> Option<&Arc<MetaObject>> {
        self.by_type.get(&key.id).map(|&i| &self.objects[i])
    }

    pub fn meta_by_name(&self, name: &str) -> Option<&Arc<MetaObject>> {
        self.by_name.get(name).map(|&i| &self.objects[i])
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&'static EnumDescriptor> {
        self.enums.get(name).copied()
    }

    /// Registered objects in registration order.
    pub fn objects(&self) -> impl Iterator<Item = &Arc<MetaObject>> {
        self.objects.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &'static EnumDescriptor> + '_ {
        self.enums.values().copied()
    }
}

impl TypeResolver for Registry {
    fn create_instance(&self, type_name: &str) -> Option<Box<dyn Object>> {
        self.meta_by_name(type_name).map(|m| m.create_instance())
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    objects: Vec<Arc<MetaObject>>,
    enums: Vec<&'static EnumDescriptor>,
}

impl RegistryBuilder {
    pub fn object(mut self, meta: impl Into<Arc<MetaObject>>) -> Self {
        self.objects.push(meta.into());
        self
    }

    /// Register an enum descriptor not referenced by any field.
    pub fn enumeration(mut self, descriptor: &'static EnumDescriptor) -> Self {
        self.enums.push(descriptor);
        self
    }

    pub fn build(self) -> Result<Registry> {
        let mut registry = Registry::default();

        for (index, meta) in self.objects.iter().enumerate() {
            if registry.by_type.insert(meta.type_key().id, index).is_some() {
                return Err(Error::metadata(
                    MetadataErrorKind::DuplicateType,
                    format!("{} is registered twice", meta.type_key().rust_name),
                ));
            }
            if registry.by_name.insert(meta.name(), index).is_some() {
                return Err(Error::metadata(
                    MetadataErrorKind::DuplicateType,
                    format!("object name '{}' is registered twice", meta.name()),
                ));
            }
        }
        registry.objects = self.objects;

        let mut enums = self.enums;
        for meta in &registry.objects {
            if let Some(base) = meta.super_object() {
                registry.require(meta.name(), "super type", base.type_key())?;
            }
            for field in meta.fields() {
                if let Some(key) = field.object_type() {
                    registry.require(meta.name(), field.name(), key)?;
                }
                if let Some(array) = field.array_info() {
                    if let Some(key) = array.element_object {
                        registry.require(meta.name(), field.name(), key)?;
                    }
                    enums.extend(array.element_enum);
                }
                if field.field_type() == FieldType::Enum || field.enum_descriptor().is_some() {
                    enums.extend(field.enum_descriptor());
                }
            }
        }

        for descriptor in enums {
            match registry.enums.get(descriptor.name) {
                Some(existing) if **existing != *descriptor => {
                    return Err(Error::metadata(
                        MetadataErrorKind::DuplicateEnum,
                        format!("two different enums are named '{}'", descriptor.name),
                    ));
                }
                Some(_) => {}
                None => {
                    registry.enums.insert(descriptor.name, descriptor);
                }
            }
        }

        tracing::debug!(
            objects = registry.objects.len(),
            enums = registry.enums.len(),
            "Built metadata registry"
        );
        Ok(registry)
    }
}

impl Registry {
    fn require(&self, owner: &str, what: &str, key: TypeKey) -> Result<()> {
        if self.by_type.contains_key(&key.id) {
            Ok(())
        } else {
            Err(Error::metadata(
                MetadataErrorKind::UnknownReference,
                format!(
                    "{}.{} refers to unregistered type {}",
                    owner, what, key.rust_name
                ),
            ))
        }
    }
}
