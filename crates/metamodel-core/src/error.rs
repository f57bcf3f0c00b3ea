//! Error types for metamodel operations.

use crate::types::FieldType;
use std::error::Error as StdError;
use std::fmt;

/// The primary error type for all metamodel operations.
#[derive(Debug)]
pub enum Error {
    /// The caller violated a protocol or API contract
    Usage(UsageError),
    /// The backend rejected an operation
    Backend(BackendError),
    /// A value could not be converted, bound or decoded
    Data(DataError),
    /// Metadata descriptors or the registry are inconsistent
    Metadata(MetadataError),
    /// Configuration could not be loaded
    Config(ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// Statement executed before it was prepared
    NotPrepared,
    /// Statement prepared twice
    AlreadyPrepared,
    /// Statement executed twice
    AlreadyExecuted,
    /// Statement already exhausted
    StatementDone,
    /// Handle unknown to the transaction or already closed
    UnknownStatement,
    /// Inner and outer joins mixed in one select
    MixedJoins,
    /// Update without any assignment
    EmptyUpdate,
    /// Read of an unset nullable
    UnsetNullable,
    /// Begin while a unit of work is in progress
    TransactionActive,
    /// Commit or rollback without a unit of work in progress
    NoActiveTransaction,
    /// Accessor applied to an object of another type
    ObjectMismatch,
    /// Type has no metadata in the registry
    UnregisteredType,
    /// Statement keyed by primary key on an object without one
    MissingPrimaryKey,
}

/// Backend failure, carrying the backend's own message.
#[derive(Debug)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    /// Statement text, when known
    pub sql: Option<String>,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Connect,
    Transaction,
    Prepare,
    Execute,
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataError {
    pub kind: DataErrorKind,
    /// Field being processed, when known
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataErrorKind {
    /// Source value has the wrong shape for the expected field type
    TypeMismatch(FieldType),
    UnknownEnumValue(u32),
    UnknownEnumName(String),
    /// Polymorphic discriminant missing or unresolvable
    UnknownType(String),
    /// Arrays of arrays
    UnsupportedNesting,
    /// Field type cannot be bound by a connector
    UnsupportedType(FieldType),
    /// NULL into a non-nullable field
    IntegrityError,
    FormatError,
    /// Required field absent from the source
    MissingField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    DuplicateType,
    DuplicateField,
    DuplicateEnum,
    InvalidName,
    UnknownReference,
    NestedNullable,
    Layout,
    DefaultMismatch,
    SuperMismatch,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn usage(kind: UsageErrorKind, message: impl Into<String>) -> Self {
        Error::Usage(UsageError {
            kind,
            message: message.into(),
        })
    }

    pub fn backend(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Error::Backend(BackendError {
            kind,
            message: message.into(),
            sql: None,
            source: None,
        })
    }

    pub fn data(kind: DataErrorKind, message: impl Into<String>) -> Self {
        Error::Data(DataError {
            kind,
            field: None,
            message: message.into(),
        })
    }

    pub fn metadata(kind: MetadataErrorKind, message: impl Into<String>) -> Self {
        Error::Metadata(MetadataError {
            kind,
            message: message.into(),
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Attach the field name to a data error that does not carry one yet.
    #[must_use]
    pub fn in_field(self, field: &str) -> Self {
        match self {
            Error::Data(mut e) => {
                if e.field.is_none() {
                    e.field = Some(field.to_string());
                }
                Error::Data(e)
            }
            other => other,
        }
    }

    /// Attach statement text to a backend error.
    #[must_use]
    pub fn with_sql(self, sql: &str) -> Self {
        match self {
            Error::Backend(mut e) => {
                e.sql = Some(sql.to_string());
                Error::Backend(e)
            }
            other => other,
        }
    }

    pub fn usage_kind(&self) -> Option<UsageErrorKind> {
        match self {
            Error::Usage(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            Error::Backend(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn data_kind(&self) -> Option<&DataErrorKind> {
        match self {
            Error::Data(e) => Some(&e.kind),
            _ => None,
        }
    }

    pub fn metadata_kind(&self) -> Option<MetadataErrorKind> {
        match self {
            Error::Metadata(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Usage(e) => write!(f, "Usage error: {}", e),
            Error::Backend(e) => write!(f, "Backend error: {}", e),
            Error::Data(e) => write!(f, "Data error: {}", e),
            Error::Metadata(e) => write!(f, "Metadata error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failed: {}", self.kind, self.message)?;
        if let Some(sql) = &self.sql {
            write!(f, " (SQL: {})", sql)?;
        }
        Ok(())
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field '{}': {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Backend(e) => e.source.as_ref().map(|s| &**s as &(dyn StdError + 'static)),
            Error::Config(e) => e.source.as_ref().map(|s| &**s as &(dyn StdError + 'static)),
            _ => None,
        }
    }
}

impl StdError for UsageError {}
impl StdError for DataError {}
impl StdError for MetadataError {}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| &**s as &(dyn StdError + 'static))
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| &**s as &(dyn StdError + 'static))
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Error::Data(err)
    }
}

/// Result type alias for metamodel operations.
pub type Result<T> = std::result::Result<T, Error>;
