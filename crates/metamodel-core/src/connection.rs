//! Connector protocol: transactions, statement handles and row binding.
//!
//! A backend implements [`Connector`]. [`Transaction`] wraps one connector and
//! enforces the statement lifecycle on top of it:
//!
//! ```text
//! Created --prepare--> Prepared --exec--> Executed --exhausted--> Done
//! ```
//!
//! States only move forward. Every handle the transaction creates stays in
//! its open-handle set until `close_statement`; dropping the transaction with
//! handles still open releases them and emits one warning.

use crate::datetime::{BackendTime, DateTime};
use crate::dialect::Dialect;
use crate::error::{DataErrorKind, Error, Result, UsageErrorKind};
use crate::field::MetaField;
use crate::meta::MetaObject;
use crate::object::Object;
use crate::storable::Storable;
use crate::types::FieldType;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatementState {
    Created,
    Prepared,
    Executed,
    Done,
}

/// Opaque reference to a statement owned by a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementHandle {
    id: u64,
    kind: StatementKind,
}

impl StatementHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }
}

/// Read access to the current row of an executed statement.
///
/// Strings are fetched in two phases: the byte length first, then the bytes
/// into a buffer of exactly that length.
pub trait RowSource {
    fn column_count(&self) -> usize;

    fn column_name(&self, index: usize) -> &str;

    fn is_null(&self, index: usize) -> Result<bool>;

    /// Fixed-width value (bool, integer, float or enum) as `field_type`.
    fn fetch_fixed(&self, index: usize, field_type: FieldType) -> Result<Value>;

    fn text_len(&self, index: usize) -> Result<usize>;

    fn fetch_text(&self, index: usize, buffer: &mut [u8]) -> Result<()>;

    /// Date-time with a one-based month.
    fn fetch_time(&self, index: usize) -> Result<BackendTime>;
}

/// A backend connection able to run statements.
///
/// Implementations report failures as [`Error::Backend`] carrying the
/// backend's own message; lifecycle checks are done by [`Transaction`].
pub trait Connector: Send {
    type Statement: RowSource + Send;

    fn dialect(&self) -> Dialect;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn create_statement(&mut self, kind: StatementKind, sql: &str) -> Result<Self::Statement>;

    /// Validate and compile the statement text.
    fn prepare(&mut self, statement: &mut Self::Statement) -> Result<()>;

    /// Run the statement with positional parameters; returns affected rows.
    fn execute(&mut self, statement: &mut Self::Statement, params: &[Value]) -> Result<u64>;

    /// Advance to the next row; `false` once exhausted.
    fn fetch(&mut self, statement: &mut Self::Statement) -> Result<bool>;

    fn last_insert_id(&mut self, statement: &Self::Statement) -> Result<i64>;

    /// Free the backend resources of a statement.
    fn release(&mut self, statement: Self::Statement);
}

struct HandleEntry<S> {
    sql: String,
    state: StatementState,
    params: Vec<Value>,
    statement: S,
}

struct Inner<C: Connector> {
    connector: C,
    active: bool,
    next_id: u64,
    handles: BTreeMap<StatementHandle, HandleEntry<C::Statement>>,
}

impl<C: Connector> Inner<C> {
    fn entry(&mut self, handle: StatementHandle) -> Result<&mut HandleEntry<C::Statement>> {
        self.handles
            .get_mut(&handle)
            .ok_or_else(|| unknown_statement(handle))
    }
}

fn unknown_statement(handle: StatementHandle) -> Error {
    Error::usage(
        UsageErrorKind::UnknownStatement,
        format!("no such statement: {}", handle.id),
    )
}

fn state_error(state: StatementState, wanted: StatementState) -> Error {
    let kind = match state {
        StatementState::Created => UsageErrorKind::NotPrepared,
        StatementState::Prepared => UsageErrorKind::AlreadyPrepared,
        StatementState::Executed => UsageErrorKind::AlreadyExecuted,
        StatementState::Done => UsageErrorKind::StatementDone,
    };
    Error::usage(
        kind,
        format!("statement is {:?}, expected {:?}", state, wanted),
    )
}

/// One logical unit of work over a single connector.
pub struct Transaction<C: Connector> {
    inner: Mutex<Inner<C>>,
}

impl<C: Connector> Transaction<C> {
    pub fn new(connector: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                connector,
                active: false,
                next_id: 1,
                handles: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dialect(&self) -> Dialect {
        self.lock().connector.dialect()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn open_statements(&self) -> usize {
        self.lock().handles.len()
    }

    /// Run `f` with exclusive access to the connector.
    pub fn with_connector<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.lock().connector)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.active {
            return Err(Error::usage(
                UsageErrorKind::TransactionActive,
                "a transaction is already in progress",
            ));
        }
        tracing::info!("Beginning transaction");
        inner.connector.begin()?;
        inner.active = true;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(Error::usage(
                UsageErrorKind::NoActiveTransaction,
                "commit without a transaction in progress",
            ));
        }
        tracing::info!("Committing transaction");
        inner.connector.commit()?;
        inner.active = false;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(Error::usage(
                UsageErrorKind::NoActiveTransaction,
                "rollback without a transaction in progress",
            ));
        }
        tracing::info!("Rolling back transaction");
        inner.connector.rollback()?;
        inner.active = false;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, sql))]
    pub fn create_statement(
        &self,
        kind: StatementKind,
        sql: impl Into<String>,
    ) -> Result<StatementHandle> {
        let sql = sql.into();
        let mut inner = self.lock();
        let statement = inner
            .connector
            .create_statement(kind, &sql)
            .map_err(|e| e.with_sql(&sql))?;
        let handle = StatementHandle {
            id: inner.next_id,
            kind,
        };
        inner.next_id += 1;
        tracing::trace!(id = handle.id, sql = %sql, "Created statement");
        inner.handles.insert(
            handle,
            HandleEntry {
                sql,
                state: StatementState::Created,
                params: Vec::new(),
                statement,
            },
        );
        Ok(handle)
    }

    pub fn statement_state(&self, handle: StatementHandle) -> Result<StatementState> {
        self.lock().entry(handle).map(|e| e.state)
    }

    /// Supply positional parameters for the next execution.
    pub fn bind_parameters(&self, handle: StatementHandle, params: Vec<Value>) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.entry(handle)?;
        if entry.state > StatementState::Prepared {
            return Err(state_error(entry.state, StatementState::Prepared));
        }
        entry.params = params;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn prepare(&self, handle: StatementHandle) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| unknown_statement(handle))?;
        prepare_entry(&mut inner.connector, entry)
    }

    /// Execute a prepared statement; returns the affected row count.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn exec_statement(&self, handle: StatementHandle) -> Result<u64> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| unknown_statement(handle))?;
        execute_entry(&mut inner.connector, entry)
    }

    /// Bind the next row into `target`, preparing and executing on first use.
    ///
    /// Returns `false` once the rows are exhausted; the statement is then
    /// `Done` and later calls keep returning `false`.
    #[tracing::instrument(level = "debug", skip(self, target, meta))]
    pub fn fetch_next(
        &self,
        handle: StatementHandle,
        target: &mut dyn Object,
        meta: &MetaObject,
    ) -> Result<bool> {
        if !meta.is_instance(target) {
            return Err(Error::usage(
                UsageErrorKind::ObjectMismatch,
                format!("fetch target is not a {}", meta.name()),
            ));
        }
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| unknown_statement(handle))?;

        match entry.state {
            StatementState::Done => return Ok(false),
            StatementState::Created => {
                prepare_entry(&mut inner.connector, entry)?;
                execute_entry(&mut inner.connector, entry)?;
            }
            StatementState::Prepared => {
                execute_entry(&mut inner.connector, entry)?;
            }
            StatementState::Executed => {}
        }

        if !inner
            .connector
            .fetch(&mut entry.statement)
            .map_err(|e| e.with_sql(&entry.sql))?
        {
            entry.state = StatementState::Done;
            return Ok(false);
        }
        bind_row(&entry.statement, meta, target)?;
        Ok(true)
    }

    /// Write the backend-generated key of an executed insert into the
    /// storable's primary key. Returns `false` when it has none.
    #[tracing::instrument(level = "debug", skip(self, storable))]
    pub fn get_last_insert_id<T: Object>(
        &self,
        handle: StatementHandle,
        storable: &mut Storable<T>,
    ) -> Result<bool> {
        let (record, meta) = storable.parts_mut();
        let Some(key) = meta.primary_key() else {
            return Ok(false);
        };
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| unknown_statement(handle))?;
        if entry.state < StatementState::Executed {
            return Err(state_error(entry.state, StatementState::Executed));
        }
        let id = inner.connector.last_insert_id(&entry.statement)?;
        let value = Value::Int64(id)
            .coerce_integer(key.field_type())
            .map_err(|e| e.in_field(key.name()))?;
        key.set(record, value)?;
        Ok(true)
    }

    /// Remove a handle from the open set and release it.
    pub fn close_statement(&self, handle: StatementHandle) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner
            .handles
            .remove(&handle)
            .ok_or_else(|| unknown_statement(handle))?;
        inner.connector.release(entry.statement);
        tracing::trace!(id = handle.id, "Closed statement");
        Ok(())
    }
}

fn prepare_entry<C: Connector>(
    connector: &mut C,
    entry: &mut HandleEntry<C::Statement>,
) -> Result<()> {
    if entry.state != StatementState::Created {
        return Err(state_error(entry.state, StatementState::Created));
    }
    connector
        .prepare(&mut entry.statement)
        .map_err(|e| e.with_sql(&entry.sql))?;
    entry.state = StatementState::Prepared;
    Ok(())
}

fn execute_entry<C: Connector>(
    connector: &mut C,
    entry: &mut HandleEntry<C::Statement>,
) -> Result<u64> {
    if entry.state != StatementState::Prepared {
        return Err(state_error(entry.state, StatementState::Prepared));
    }
    let affected = connector
        .execute(&mut entry.statement, &entry.params)
        .map_err(|e| e.with_sql(&entry.sql))?;
    entry.state = StatementState::Executed;
    tracing::debug!(affected = affected, sql = %entry.sql, "Executed statement");
    Ok(affected)
}

impl<C: Connector> Drop for Transaction<C> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !inner.handles.is_empty() {
            tracing::warn!(
                open_statements = inner.handles.len(),
                "Transaction dropped with unclosed statements; releasing them"
            );
            for (_, entry) in std::mem::take(&mut inner.handles) {
                inner.connector.release(entry.statement);
            }
        }
        if inner.active {
            match inner.connector.rollback() {
                Ok(()) => tracing::debug!("Rolled back unfinished transaction on drop"),
                Err(e) => tracing::error!(error = %e, "Rollback on drop failed"),
            }
        }
    }
}

impl<C: Connector> std::fmt::Debug for Transaction<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Transaction")
            .field("dialect", &inner.connector.dialect())
            .field("active", &inner.active)
            .field("open_statements", &inner.handles.len())
            .finish()
    }
}

// ============================================================================
// Row binding
// ============================================================================

/// Bind the current row of `row` into `target`, matching result columns to
/// fields by name, case-insensitively.
///
/// Columns without a matching field are skipped with a warning. A failure
/// stops at the offending column; fields bound before it keep their values.
pub fn bind_row(row: &dyn RowSource, meta: &MetaObject, target: &mut dyn Object) -> Result<()> {
    for index in 0..row.column_count() {
        let name = row.column_name(index);
        let Some(field) = meta.field_by_name(name, false) else {
            tracing::warn!(
                column = name,
                object = meta.name(),
                "Result column has no matching field; skipping"
            );
            continue;
        };
        bind_column(row, index, field, target)?;
    }
    Ok(())
}

fn bind_column(
    row: &dyn RowSource,
    index: usize,
    field: &MetaField,
    target: &mut dyn Object,
) -> Result<()> {
    if row.is_null(index)? {
        if !field.is_nullable() {
            return Err(Error::data(
                DataErrorKind::IntegrityError,
                "NULL fetched into a non-nullable field",
            )
            .in_field(field.name()));
        }
        return field.set(target, Value::Null);
    }

    let field_type = field.field_type();
    let value = match field_type {
        FieldType::Bool
        | FieldType::Int32
        | FieldType::Uint32
        | FieldType::Int64
        | FieldType::Uint64
        | FieldType::Float
        | FieldType::Double
        | FieldType::Enum => row.fetch_fixed(index, field_type),
        FieldType::String => fetch_string(row, index),
        FieldType::DateTime => row
            .fetch_time(index)
            .and_then(DateTime::try_from)
            .map(Value::DateTime),
        FieldType::Object | FieldType::Array | FieldType::Variant => Err(Error::data(
            DataErrorKind::UnsupportedType(field_type),
            "cannot bind non-plain objects from a result column",
        )),
    }
    .map_err(|e| e.in_field(field.name()))?;
    field.set(target, value)
}

fn fetch_string(row: &dyn RowSource, index: usize) -> Result<Value> {
    let len = row.text_len(index)?;
    let mut buffer = vec![0u8; len];
    row.fetch_text(index, &mut buffer)?;
    String::from_utf8(buffer)
        .map(Value::String)
        .map_err(|e| Error::data(DataErrorKind::FormatError, e.to_string()))
}
