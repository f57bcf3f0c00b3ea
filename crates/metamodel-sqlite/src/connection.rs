//! SQLite connector backed by rusqlite.
//!
//! Query results are materialized when a statement executes: every row is
//! copied into owned [`SqlValue`]s so the statement can outlive the borrow
//! of the underlying connection.

use crate::config::SqliteConfig;
use metamodel_core::{
    BackendError, BackendErrorKind, BackendTime, Connector, DataErrorKind, Dialect, Error,
    FieldType, Result, RowSource, StatementKind, Value, validate,
};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use std::borrow::Cow;
use std::collections::VecDeque;

fn backend_error(kind: BackendErrorKind, err: rusqlite::Error) -> Error {
    Error::Backend(BackendError {
        kind,
        message: err.to_string(),
        sql: None,
        source: Some(Box::new(err)),
    })
}

/// A single SQLite database connection.
pub struct SqliteConnector {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteConnector {
    /// Open the database described by `config`.
    #[tracing::instrument(level = "debug", skip(config), fields(path = ?config.path))]
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let flags = config.open_flags();
        let conn = match &config.path {
            Some(path) => Connection::open_with_flags(path, flags),
            None => Connection::open_in_memory_with_flags(flags),
        }
        .map_err(|e| backend_error(BackendErrorKind::Connect, e))?;

        conn.busy_timeout(config.busy_timeout_duration())
            .map_err(|e| backend_error(BackendErrorKind::Connect, e))?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(|e| backend_error(BackendErrorKind::Connect, e))?;

        tracing::info!(memory = config.is_memory(), "Opened SQLite database");
        Ok(Self {
            conn,
            config: config.clone(),
        })
    }

    /// Open a private in-memory database with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// The raw rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| backend_error(BackendErrorKind::Transaction, e).with_sql(sql))
    }
}

impl std::fmt::Debug for SqliteConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnector")
            .field("config", &self.config)
            .field("autocommit", &self.conn.is_autocommit())
            .finish()
    }
}

/// Statement text plus the rows it produced.
#[derive(Debug)]
pub struct SqliteStatement {
    kind: StatementKind,
    sql: String,
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Vec<SqlValue>,
}

impl SqliteStatement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Rows buffered but not fetched yet.
    pub fn pending_rows(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, index: usize) -> Result<&SqlValue> {
        self.current.get(index).ok_or_else(|| {
            Error::backend(
                BackendErrorKind::Fetch,
                format!(
                    "column {} requested but the current row has {} columns",
                    index,
                    self.current.len()
                ),
            )
        })
    }

    fn text_bytes(&self, index: usize) -> Result<Cow<'_, [u8]>> {
        Ok(match self.cell(index)? {
            SqlValue::Text(s) => Cow::Borrowed(s.as_bytes()),
            SqlValue::Blob(b) => Cow::Borrowed(b.as_slice()),
            SqlValue::Integer(n) => Cow::Owned(n.to_string().into_bytes()),
            SqlValue::Real(f) => Cow::Owned(f.to_string().into_bytes()),
            SqlValue::Null => Cow::Borrowed(&[]),
        })
    }
}

fn column_mismatch(target: FieldType, cell: &SqlValue) -> Error {
    Error::data(
        DataErrorKind::TypeMismatch(target),
        format!("SQLite {:?} cannot be read as {}", cell.data_type(), target),
    )
}

impl RowSource for SqliteStatement {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> &str {
        self.columns.get(index).map_or("", String::as_str)
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        Ok(matches!(self.cell(index)?, SqlValue::Null))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fetch_fixed(&self, index: usize, field_type: FieldType) -> Result<Value> {
        let cell = self.cell(index)?;
        match (field_type, cell) {
            (FieldType::Bool, SqlValue::Integer(n)) => Ok(Value::Bool(*n != 0)),
            (
                FieldType::Int32
                | FieldType::Uint32
                | FieldType::Int64
                | FieldType::Uint64
                | FieldType::Enum,
                SqlValue::Integer(n),
            ) => Value::Int64(*n).coerce_integer(field_type),
            (FieldType::Float, SqlValue::Real(f)) => Ok(Value::Float(*f as f32)),
            (FieldType::Float, SqlValue::Integer(n)) => Ok(Value::Float(*n as f32)),
            (FieldType::Double, SqlValue::Real(f)) => Ok(Value::Double(*f)),
            (FieldType::Double, SqlValue::Integer(n)) => Ok(Value::Double(*n as f64)),
            _ => Err(column_mismatch(field_type, cell)),
        }
    }

    fn text_len(&self, index: usize) -> Result<usize> {
        Ok(self.text_bytes(index)?.len())
    }

    fn fetch_text(&self, index: usize, buffer: &mut [u8]) -> Result<()> {
        let bytes = self.text_bytes(index)?;
        if buffer.len() != bytes.len() {
            return Err(Error::backend(
                BackendErrorKind::Fetch,
                format!(
                    "text buffer holds {} bytes but the column has {}",
                    buffer.len(),
                    bytes.len()
                ),
            ));
        }
        buffer.copy_from_slice(&bytes);
        Ok(())
    }

    fn fetch_time(&self, index: usize) -> Result<BackendTime> {
        let cell = self.cell(index)?;
        match cell {
            SqlValue::Text(text) => {
                let Some([year, month, day, hour, minute, second]) = validate::datetime_parts(text)
                else {
                    return Err(Error::data(
                        DataErrorKind::FormatError,
                        format!("'{}' is not a date-time of the form YYYY-MM-DD HH:MM:SS", text),
                    ));
                };
                let year = i32::try_from(year).map_err(|_| {
                    Error::data(DataErrorKind::FormatError, format!("year {} out of range", year))
                })?;
                Ok(BackendTime {
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                })
            }
            SqlValue::Integer(seconds) => {
                metamodel_core::DateTime::from_unix(*seconds).map(BackendTime::from)
            }
            _ => Err(column_mismatch(FieldType::DateTime, cell)),
        }
    }
}

/// Convert a bound parameter into its SQLite storage class.
fn to_sql_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int32(n) => SqlValue::Integer(i64::from(*n)),
        Value::Uint32(n) | Value::Enum(n) => SqlValue::Integer(i64::from(*n)),
        Value::Int64(n) => SqlValue::Integer(*n),
        Value::Uint64(n) => SqlValue::Integer(i64::try_from(*n).map_err(|_| {
            Error::data(
                DataErrorKind::TypeMismatch(FieldType::Int64),
                format!("{} exceeds the SQLite integer range", n),
            )
        })?),
        Value::Float(f) => SqlValue::Real(f64::from(*f)),
        Value::Double(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::DateTime(dt) => SqlValue::Text(dt.to_string()),
        Value::Object(_) => {
            return Err(Error::data(
                DataErrorKind::UnsupportedType(FieldType::Object),
                "objects cannot be bound as parameters",
            ));
        }
        Value::Array(_) => {
            return Err(Error::data(
                DataErrorKind::UnsupportedType(FieldType::Array),
                "arrays cannot be bound as parameters",
            ));
        }
    })
}

impl Connector for SqliteConnector {
    type Statement = SqliteStatement;

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    fn create_statement(&mut self, kind: StatementKind, sql: &str) -> Result<SqliteStatement> {
        Ok(SqliteStatement {
            kind,
            sql: sql.to_string(),
            columns: Vec::new(),
            rows: VecDeque::new(),
            current: Vec::new(),
        })
    }

    fn prepare(&mut self, statement: &mut SqliteStatement) -> Result<()> {
        let stmt = self
            .conn
            .prepare_cached(&statement.sql)
            .map_err(|e| backend_error(BackendErrorKind::Prepare, e))?;
        statement.columns = stmt.column_names().into_iter().map(String::from).collect();
        Ok(())
    }

    fn execute(&mut self, statement: &mut SqliteStatement, params: &[Value]) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare_cached(&statement.sql)
            .map_err(|e| backend_error(BackendErrorKind::Prepare, e))?;
        for (i, param) in params.iter().enumerate() {
            stmt.raw_bind_parameter(i + 1, to_sql_value(param)?)
                .map_err(|e| backend_error(BackendErrorKind::Execute, e))?;
        }

        let width = stmt.column_count();
        if width == 0 {
            let affected = stmt
                .raw_execute()
                .map_err(|e| backend_error(BackendErrorKind::Execute, e))?;
            return Ok(u64::try_from(affected).unwrap_or(u64::MAX));
        }

        statement.rows.clear();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows
            .next()
            .map_err(|e| backend_error(BackendErrorKind::Execute, e))?
        {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(
                    row.get::<_, SqlValue>(i)
                        .map_err(|e| backend_error(BackendErrorKind::Fetch, e))?,
                );
            }
            statement.rows.push_back(values);
        }
        tracing::trace!(rows = statement.rows.len(), "Buffered result rows");
        Ok(0)
    }

    fn fetch(&mut self, statement: &mut SqliteStatement) -> Result<bool> {
        match statement.rows.pop_front() {
            Some(row) => {
                statement.current = row;
                Ok(true)
            }
            None => {
                statement.current.clear();
                Ok(false)
            }
        }
    }

    fn last_insert_id(&mut self, _statement: &SqliteStatement) -> Result<i64> {
        Ok(self.conn.last_insert_rowid())
    }

    fn release(&mut self, statement: SqliteStatement) {
        tracing::trace!(sql = %statement.sql, "Released statement");
    }
}
