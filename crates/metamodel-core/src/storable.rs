//! Records bound to their metadata.

use crate::error::{Error, Result, UsageErrorKind};
use crate::meta::MetaObject;
use crate::object::Object;
use crate::registry::Registry;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A record together with the `MetaObject` describing it; the target of
/// query builders.
///
/// Derefs to the record, so fields are read and written directly.
#[derive(Debug, Clone)]
pub struct Storable<T: Object> {
    record: T,
    meta: Arc<MetaObject>,
}

impl<T: Object> Storable<T> {
    pub fn new(registry: &Registry, record: T) -> Result<Self> {
        let meta = Arc::clone(registry.meta_of::<T>()?);
        Ok(Self { record, meta })
    }

    pub fn with_meta(meta: Arc<MetaObject>, record: T) -> Result<Self> {
        if !meta.is_instance(&record) {
            return Err(Error::usage(
                UsageErrorKind::ObjectMismatch,
                format!(
                    "{} does not describe {}",
                    meta.name(),
                    std::any::type_name::<T>()
                ),
            ));
        }
        Ok(Self { record, meta })
    }

    pub fn meta(&self) -> &Arc<MetaObject> {
        &self.meta
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }

    /// Record and metadata borrowed together, for binding into the record.
    pub fn parts_mut(&mut self) -> (&mut T, &MetaObject) {
        (&mut self.record, &self.meta)
    }
}

impl<T: Object> Deref for Storable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T: Object> DerefMut for Storable<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.record
    }
}
