//! Name to factory maps for polymorphic decoding.

use metamodel_core::{Object, Registry, TypeResolver};
use std::collections::HashMap;

type Factory = fn() -> Box<dyn Object>;

fn create<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

/// A [`TypeResolver`] over an explicit set of types.
///
/// Decoding with a `TypeMap` limits polymorphic values to the listed
/// types, whatever else the registry knows about. Every listed type must
/// still be registered, since its fields are decoded through its metadata.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    factories: HashMap<String, Factory>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every object in `registry`, under its registered name.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut map = Self::new();
        for meta in registry.objects() {
            map.factories
                .insert(meta.name().to_string(), meta.factory());
        }
        map
    }

    /// Map `name` to `T`.
    pub fn insert<T: Object + Default>(mut self, name: impl Into<String>) -> Self {
        self.factories.insert(name.into(), create::<T>);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl TypeResolver for TypeMap {
    fn create_instance(&self, type_name: &str) -> Option<Box<dyn Object>> {
        self.factories.get(type_name).map(|factory| factory())
    }
}
