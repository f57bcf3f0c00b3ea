//! Metadata-driven object mapping for Rust.
//!
//! `metamodel` is the facade crate: it re-exports the metadata registry and
//! connector protocol from `metamodel-core`, the expression language and
//! statement builders from `metamodel-query`, the JSON serializer from
//! `metamodel-json` and, with the default `sqlite` feature, the SQLite
//! connector.
//!
//! # Example
//!
//! ```rust,ignore
//! use metamodel::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Person {
//!     id: u64,
//!     name: String,
//!     age: Nullable<i32>,
//! }
//! impl_object!(Person);
//!
//! let registry = Registry::builder()
//!     .object(
//!         MetaObject::builder::<Person>("Person")
//!             .field(meta_field!(Person, id).primary_key(true).auto_increment(true))
//!             .field(meta_field!(Person, name))
//!             .field(meta_field!(Person, age))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let tx = metamodel::sqlite::open(&SqliteConfig::memory())?;
//! let mut alice = Storable::new(&registry, Person { name: "Alice".into(), ..Default::default() })?;
//! Insert::new(&mut alice).exec(&tx)?;
//!
//! let name = Column::<Person, String>::of(&registry, "name")?;
//! let mut row = Storable::new(&registry, Person::default())?;
//! let people = Select::new(&mut row).filter(name.like("A%")).exec(&tx)?.fetch_all()?;
//! ```

pub use metamodel_core::{
    ArrayInfo, BackendError, BackendErrorKind, BackendTime, ConfigError, Connector, DataError,
    DataErrorKind, DateTime, Dialect, EnumDescriptor, EnumKind, Error, FieldInspector, FieldType,
    FieldValue, FieldVisitor, Mandatoriness, MetaField, MetaObject, MetaObjectBuilder,
    MetadataError, MetadataErrorKind, Month, Nullable, Object, Registry, RegistryBuilder, Result,
    RowSource, StatementHandle, StatementKind, StatementState, Storable, Transaction, TypeKey,
    TypeResolver, UsageError, UsageErrorKind, Value, Variant, bind_row, enum_from_string,
    enum_to_string, impl_object, meta_enum, meta_field,
};
pub use metamodel_query::{
    AstHandler, Assignment, BinaryOp, Column, ColumnRef, Comparator, Connective, Custom, Delete,
    Expr, ExprNode, Insert, IntoExpr, JoinKind, ResultSet, Select, SqlCompiler, SqlStatement,
    UnaryOp, Update, compile, walk,
};

/// JSON encoding and decoding of registered objects.
pub mod json {
    pub use metamodel_json::*;
}

/// The SQLite connector.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use metamodel_sqlite::*;
}

/// Everything needed to describe records, build statements and run them.
pub mod prelude {
    pub use crate::json::{JsonOptions, TypeMap};
    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::{SqliteConfig, SqliteConnector};
    pub use crate::{
        Column, Connector, Custom, DateTime, Delete, Dialect, Error, Expr, Insert, IntoExpr,
        Mandatoriness, MetaObject, Month, Nullable, Object, Registry, Result, Select, Storable,
        Transaction, Update, Value, Variant, impl_object, meta_enum, meta_field,
    };
}
