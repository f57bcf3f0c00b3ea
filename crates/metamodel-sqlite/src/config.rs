//! SQLite connection configuration.
//!
//! Settings can be assembled with builder methods or loaded from JSON:
//!
//! ```ignore
//! let config = SqliteConfig::from_json(r#"{ "path": "app.db", "busy_timeout_ms": 2000 }"#)?;
//! let memory = SqliteConfig::memory().foreign_keys(true);
//! ```

use metamodel_core::{ConfigError, Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// SQLite connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqliteConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    /// Open without write access
    pub read_only: bool,
    /// Create the file when missing (ignored when read-only)
    pub create: bool,
    /// How long a locked database is retried before failing, in milliseconds
    pub busy_timeout_ms: u64,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create: true,
            busy_timeout_ms: 5_000,
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Create a new configuration with default values (in-memory).
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for a database file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the database file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path.is_none()
    }

    pub fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Parse a configuration from JSON; absent keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid SQLite configuration: {}", e),
                source: Some(Box::new(e)),
            })
        })
    }

    pub(crate) fn open_flags(&self) -> rusqlite::OpenFlags {
        use rusqlite::OpenFlags;

        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_memory() {
        let config = SqliteConfig::default();
        assert!(config.is_memory());
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_builder() {
        let config = SqliteConfig::file("app.db")
            .read_only(true)
            .busy_timeout(Duration::from_millis(250))
            .foreign_keys(false);
        assert_eq!(config.path, Some(PathBuf::from("app.db")));
        assert!(config.read_only);
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(
            config
                .open_flags()
                .contains(rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        );
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = SqliteConfig::from_json(r#"{ "path": "x.db", "busy_timeout_ms": 10 }"#).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("x.db")));
        assert_eq!(config.busy_timeout_ms, 10);
        assert!(config.create);
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        let err = SqliteConfig::from_json(r#"{ "pth": "x.db" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("pth"));
    }
}
