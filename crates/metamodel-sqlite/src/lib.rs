//! SQLite connector for metamodel.
//!
//! ```ignore
//! let tx = metamodel_sqlite::open(&SqliteConfig::memory())?;
//! Custom::new("CREATE TABLE Person (id INTEGER PRIMARY KEY, name TEXT)").exec(&tx)?;
//! ```

pub mod config;
pub mod connection;

pub use config::SqliteConfig;
pub use connection::{SqliteConnector, SqliteStatement};

use metamodel_core::{Result, Transaction};

/// Open a database and wrap it in a [`Transaction`].
pub fn open(config: &SqliteConfig) -> Result<Transaction<SqliteConnector>> {
    SqliteConnector::open(config).map(Transaction::new)
}
