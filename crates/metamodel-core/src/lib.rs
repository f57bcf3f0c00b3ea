//! Core types and traits for metamodel.
//!
//! `metamodel-core` is the **foundation layer** of the workspace. It defines
//! runtime metadata for plain Rust records and the protocol every backend
//! implements.
//!
//! # Role In The Architecture
//!
//! - **Metadata**: `MetaObject`, `MetaField` and `EnumDescriptor` describe
//!   records field by field; the `Registry` indexes them by type and name.
//! - **Data model**: `Value`, `Nullable`, `DateTime` and `Variant` are the
//!   shared vocabulary of query parameters, result binding and serialization.
//! - **Connector protocol**: `Connector` and `RowSource` are implemented by
//!   backends; `Transaction` enforces the statement lifecycle on top of them.
//!
//! # Who Uses This Crate
//!
//! - `metamodel-query` compiles expressions and builders against `MetaObject`.
//! - `metamodel-sqlite` implements `Connector`.
//! - `metamodel-json` walks records through `FieldVisitor` and `FieldInspector`.
//!
//! Most applications should use the `metamodel` facade.

pub mod connection;
pub mod datetime;
pub mod dialect;
pub mod enums;
pub mod error;
pub mod field;
pub mod meta;
pub mod nullable;
pub mod object;
pub mod registry;
pub mod storable;
pub mod types;
pub mod validate;
pub mod value;

pub use connection::{
    Connector, RowSource, StatementHandle, StatementKind, StatementState, Transaction, bind_row,
};
pub use datetime::{BackendTime, DateTime, Month};
pub use dialect::Dialect;
pub use enums::{EnumDescriptor, EnumKind, enum_from_string, enum_to_string};
pub use error::{
    BackendError, BackendErrorKind, ConfigError, DataError, DataErrorKind, Error, MetadataError,
    MetadataErrorKind, Result, UsageError, UsageErrorKind,
};
pub use field::{Mandatoriness, MetaField};
pub use meta::{FieldInspector, FieldVisitor, MetaObject, MetaObjectBuilder};
pub use nullable::Nullable;
pub use object::{Object, Variant};
pub use registry::{Registry, RegistryBuilder, TypeResolver};
pub use storable::Storable;
pub use types::{ArrayInfo, FieldType, FieldValue, TypeKey};
pub use value::Value;
