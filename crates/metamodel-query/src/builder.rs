//! Statement builders for SELECT, INSERT, UPDATE, DELETE and custom SQL.
//!
//! Every builder targets a [`Storable`] record. Builder state is
//! dialect-agnostic; SQL text is produced by `build_query(dialect)`, and
//! `exec` renders for the transaction's dialect:
//! - `Select` returns a lazy [`ResultSet`] binding rows into the record
//! - `Insert` binds the record's current values as parameters
//! - `Update` and `Delete` return affected row counts
//!
//! # Example
//!
//! ```ignore
//! let name = Column::<Person, String>::of(&registry, "name")?;
//! let mut person = Storable::new(&registry, Person::default())?;
//! let mut rows = Select::new(&mut person)
//!     .filter(name.like("A%"))
//!     .order_asc(&name)
//!     .limit(10)
//!     .exec(&tx)?;
//! while rows.fetch_next()? {
//!     println!("{}", rows.current().name);
//! }
//! ```

use crate::compiler::SqlCompiler;
use crate::expr::{AssignedValue, Assignment, Expr, IntoExpr};
use crate::result::{HandleGuard, ResultSet};
use metamodel_core::{
    Connector, Dialect, Error, Mandatoriness, MetaField, MetaObject, Object, Result,
    StatementKind, Storable, Transaction, UsageErrorKind, Value,
};

/// The narrow interface shared by all statements.
pub trait SqlStatement {
    fn kind(&self) -> StatementKind;

    /// Render the statement text for `dialect`.
    fn build_query(&self, dialect: Dialect) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone)]
struct Join {
    table: &'static str,
    on: Option<Expr>,
}

fn and_filter(existing: Option<Expr>, expr: Expr) -> Option<Expr> {
    Some(match existing {
        Some(existing) => existing.and(expr),
        None => expr,
    })
}

// `WHERE <filter> [AND <pk> = <placeholder>]`, with the key value appended
// to `params`.
fn where_clause(
    dialect: Dialect,
    meta: &MetaObject,
    record: &dyn Object,
    filter: Option<&Expr>,
    by_key: bool,
    params: &mut Vec<Value>,
) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(filter) = filter {
        parts.push(SqlCompiler::new(dialect).compile(filter)?);
    }
    if by_key {
        let key = primary_key(meta)?;
        params.push(key.get(record)?);
        parts.push(format!(
            "{} = {}",
            dialect.qualified(meta.table_name(), key.name()),
            dialect.placeholder(params.len())
        ));
    }
    Ok(match parts.len() {
        0 => String::new(),
        1 => format!(" WHERE {}", parts[0]),
        _ => format!(" WHERE ({}) AND {}", parts[0], parts[1]),
    })
}

fn primary_key(meta: &MetaObject) -> Result<&MetaField> {
    meta.primary_key().ok_or_else(|| {
        Error::usage(
            UsageErrorKind::MissingPrimaryKey,
            format!("{} declares no primary key", meta.name()),
        )
    })
}

fn run<C: Connector>(
    tx: &Transaction<C>,
    kind: StatementKind,
    sql: String,
    params: Vec<Value>,
) -> Result<u64> {
    let handle = tx.create_statement(kind, sql)?;
    let _guard = HandleGuard::new(tx, handle);
    tx.bind_parameters(handle, params)?;
    tx.prepare(handle)?;
    tx.exec_statement(handle)
}

// ============================================================================
// SELECT
// ============================================================================

/// SELECT builder; rows are bound into the target record.
#[derive(Debug)]
pub struct Select<'s, T: Object> {
    storable: &'s mut Storable<T>,
    filter: Option<Expr>,
    join_kind: Option<JoinKind>,
    joins: Vec<Join>,
    order: Vec<(Expr, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'s, T: Object> Select<'s, T> {
    pub fn new(storable: &'s mut Storable<T>) -> Self {
        Self {
            storable,
            filter: None,
            join_kind: None,
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn join(mut self, kind: JoinKind, table: &MetaObject, on: Option<Expr>) -> Result<Self> {
        if let Some(active) = self.join_kind {
            if active != kind {
                return Err(Error::usage(
                    UsageErrorKind::MixedJoins,
                    format!("cannot add a {:?} join to a {:?} join", kind, active),
                ));
            }
        }
        self.join_kind = Some(kind);
        self.joins.push(Join {
            table: table.table_name(),
            on,
        });
        Ok(self)
    }

    /// Inner join without a condition; constrain it through `filter`.
    pub fn inner_join(self, table: &MetaObject) -> Result<Self> {
        self.join(JoinKind::Inner, table, None)
    }

    pub fn inner_join_on(self, table: &MetaObject, on: Expr) -> Result<Self> {
        self.join(JoinKind::Inner, table, Some(on))
    }

    /// Left outer join without a condition.
    pub fn outer_join(self, table: &MetaObject) -> Result<Self> {
        self.join(JoinKind::LeftOuter, table, None)
    }

    pub fn outer_join_on(self, table: &MetaObject, on: Expr) -> Result<Self> {
        self.join(JoinKind::LeftOuter, table, Some(on))
    }

    /// Add a WHERE condition, AND-ed with any previous one.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = and_filter(self.filter.take(), expr);
        self
    }

    pub fn order_asc(mut self, column: impl IntoExpr) -> Self {
        self.order.push((column.into_expr(), true));
        self
    }

    pub fn order_desc(mut self, column: impl IntoExpr) -> Self {
        self.order.push((column.into_expr(), false));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the SELECT with the default dialect (Postgres).
    pub fn build(&self) -> Result<String> {
        self.build_query(Dialect::default())
    }

    /// Create the statement and return a cursor over its rows.
    #[tracing::instrument(level = "debug", skip(self, tx))]
    pub fn exec<'t, C: Connector>(
        self,
        tx: &'t Transaction<C>,
    ) -> Result<ResultSet<'s, 't, T, C>> {
        let sql = self.build_query(tx.dialect())?;
        let handle = tx.create_statement(StatementKind::Select, sql)?;
        Ok(ResultSet::new(HandleGuard::new(tx, handle), self.storable))
    }
}

impl<T: Object> SqlStatement for Select<'_, T> {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build_query(&self, dialect: Dialect) -> Result<String> {
        let meta = self.storable.meta();
        let mut compiler = SqlCompiler::new(dialect);

        let columns: Vec<_> = meta
            .columns()
            .map(|f| dialect.qualified(meta.table_name(), f.name()))
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            if columns.is_empty() {
                "*".to_string()
            } else {
                columns.join(", ")
            },
            dialect.quote_identifier(meta.table_name())
        );

        let keyword = match self.join_kind {
            Some(JoinKind::LeftOuter) => "LEFT OUTER JOIN",
            _ => "INNER JOIN",
        };
        for join in &self.joins {
            let on = match &join.on {
                Some(on) => compiler.compile(on)?,
                None => "1 = 1".to_string(),
            };
            sql.push_str(&format!(
                " {} {} ON {}",
                keyword,
                dialect.quote_identifier(join.table),
                on
            ));
        }

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&compiler.compile(filter)?);
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(expr, asc)| {
                    compiler
                        .compile(expr)
                        .map(|e| format!("{} {}", e, if *asc { "ASC" } else { "DESC" }))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        sql.push_str(&dialect.limit_offset(self.limit, self.offset, !self.order.is_empty()));
        Ok(sql)
    }
}

// ============================================================================
// INSERT
// ============================================================================

/// INSERT of the target record.
///
/// Auto-increment fields holding their zero value are left to the backend
/// and written back from `get_last_insert_id` after execution. Unset
/// nullable fields are omitted unless the field is `Required`.
#[derive(Debug)]
pub struct Insert<'s, T: Object> {
    storable: &'s mut Storable<T>,
}

impl<'s, T: Object> Insert<'s, T> {
    pub fn new(storable: &'s mut Storable<T>) -> Self {
        Self { storable }
    }

    // Columns to insert with their current values, plus whether the backend
    // generates the primary key.
    fn insert_columns(&self) -> Result<(Vec<(&'static str, Value)>, bool)> {
        let meta = self.storable.meta();
        let record: &dyn Object = self.storable.record();
        let mut columns = Vec::new();
        let mut generated_key = false;

        for field in meta.columns() {
            let value = field.get(record)?;
            if field.is_auto_increment()
                && (value.is_null() || value == Value::zero(field.field_type()))
            {
                generated_key |= field.is_primary_key();
                continue;
            }
            if value.is_null()
                && field.is_nullable()
                && field.get_mandatoriness() != Mandatoriness::Required
            {
                continue;
            }
            columns.push((field.name(), value));
        }
        Ok((columns, generated_key))
    }

    /// Build the INSERT SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let table = dialect.quote_identifier(self.storable.meta().table_name());
        let (columns, _) = self.insert_columns()?;
        if columns.is_empty() {
            return Ok((dialect.insert_default_values(&table), Vec::new()));
        }

        let names: Vec<_> = columns
            .iter()
            .map(|(name, _)| dialect.quote_identifier(name))
            .collect();
        let placeholders: Vec<_> = (1..=columns.len()).map(|i| dialect.placeholder(i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, columns.into_iter().map(|(_, v)| v).collect()))
    }

    /// Execute the INSERT and return rows affected; a backend-generated
    /// primary key is written into the record.
    #[tracing::instrument(level = "debug", skip(self, tx))]
    pub fn exec<C: Connector>(self, tx: &Transaction<C>) -> Result<u64> {
        let (_, generated_key) = self.insert_columns()?;
        let (sql, params) = self.build_with_dialect(tx.dialect())?;
        let handle = tx.create_statement(StatementKind::Insert, sql)?;
        let _guard = HandleGuard::new(tx, handle);
        tx.bind_parameters(handle, params)?;
        tx.prepare(handle)?;
        let affected = tx.exec_statement(handle)?;
        if generated_key {
            tx.get_last_insert_id(handle, self.storable)?;
        }
        Ok(affected)
    }
}

impl<T: Object> SqlStatement for Insert<'_, T> {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn build_query(&self, dialect: Dialect) -> Result<String> {
        self.build_with_dialect(dialect).map(|(sql, _)| sql)
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE of the target record's table.
///
/// Assignments are typed by the record type, so every `set` targets the
/// same table.
#[derive(Debug)]
pub struct Update<'s, T: Object> {
    storable: &'s Storable<T>,
    sets: Vec<Assignment<T>>,
    filter: Option<Expr>,
    by_key: bool,
}

impl<'s, T: Object> Update<'s, T> {
    pub fn new(storable: &'s Storable<T>) -> Self {
        Self {
            storable,
            sets: Vec::new(),
            filter: None,
            by_key: false,
        }
    }

    pub fn set(mut self, assignment: Assignment<T>) -> Self {
        self.sets.push(assignment);
        self
    }

    /// Assign every non-key column from the record's current values.
    pub fn set_all_from_record(mut self) -> Result<Self> {
        let meta = std::sync::Arc::clone(self.storable.meta());
        for field in meta.columns().filter(|f| !f.is_primary_key()) {
            let column = crate::expr::ColumnRef::new(&meta, field.name())?;
            self.sets.push(Assignment::current(column));
        }
        Ok(self)
    }

    /// Add a WHERE condition, AND-ed with any previous one.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = and_filter(self.filter.take(), expr);
        self
    }

    /// Restrict the update to the row whose key matches the record.
    pub fn by_primary_key(mut self) -> Self {
        self.by_key = true;
        self
    }

    /// Build the UPDATE SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        if self.sets.is_empty() {
            return Err(Error::usage(
                UsageErrorKind::EmptyUpdate,
                "update without any assignment",
            ));
        }
        let meta = self.storable.meta();
        let record: &dyn Object = self.storable.record();
        let mut compiler = SqlCompiler::new(dialect);
        let mut target = SqlCompiler::unqualified(dialect);
        let mut params = Vec::new();

        let mut sets = Vec::with_capacity(self.sets.len());
        for assignment in &self.sets {
            let rhs = match &assignment.value {
                AssignedValue::Expr(expr) => compiler.compile(expr)?,
                AssignedValue::Current => {
                    params.push(assignment.column.field().get(record)?);
                    dialect.placeholder(params.len())
                }
            };
            let lhs = target.compile(&Expr::column(assignment.column.clone()))?;
            sets.push(format!("{} = {}", lhs, rhs));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(meta.table_name()),
            sets.join(", ")
        );
        sql.push_str(&where_clause(
            dialect,
            meta,
            record,
            self.filter.as_ref(),
            self.by_key,
            &mut params,
        )?);
        Ok((sql, params))
    }

    /// Execute the UPDATE and return rows affected.
    #[tracing::instrument(level = "debug", skip(self, tx))]
    pub fn exec<C: Connector>(self, tx: &Transaction<C>) -> Result<u64> {
        let (sql, params) = self.build_with_dialect(tx.dialect())?;
        run(tx, StatementKind::Update, sql, params)
    }
}

impl<T: Object> SqlStatement for Update<'_, T> {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn build_query(&self, dialect: Dialect) -> Result<String> {
        self.build_with_dialect(dialect).map(|(sql, _)| sql)
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE from the target record's table.
#[derive(Debug)]
pub struct Delete<'s, T: Object> {
    storable: &'s Storable<T>,
    filter: Option<Expr>,
    by_key: bool,
}

impl<'s, T: Object> Delete<'s, T> {
    pub fn new(storable: &'s Storable<T>) -> Self {
        Self {
            storable,
            filter: None,
            by_key: false,
        }
    }

    /// Add a WHERE condition, AND-ed with any previous one.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = and_filter(self.filter.take(), expr);
        self
    }

    /// Restrict the delete to the row whose key matches the record.
    pub fn by_primary_key(mut self) -> Self {
        self.by_key = true;
        self
    }

    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let meta = self.storable.meta();
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(meta.table_name()));
        sql.push_str(&where_clause(
            dialect,
            meta,
            self.storable.record(),
            self.filter.as_ref(),
            self.by_key,
            &mut params,
        )?);
        Ok((sql, params))
    }

    /// Execute the DELETE and return rows affected.
    #[tracing::instrument(level = "debug", skip(self, tx))]
    pub fn exec<C: Connector>(self, tx: &Transaction<C>) -> Result<u64> {
        let (sql, params) = self.build_with_dialect(tx.dialect())?;
        run(tx, StatementKind::Delete, sql, params)
    }
}

impl<T: Object> SqlStatement for Delete<'_, T> {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn build_query(&self, dialect: Dialect) -> Result<String> {
        self.build_with_dialect(dialect).map(|(sql, _)| sql)
    }
}

// ============================================================================
// Custom
// ============================================================================

/// Statement text passed to the backend as is, in every dialect.
#[derive(Debug, Clone)]
pub struct Custom {
    sql: String,
}

impl Custom {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    #[tracing::instrument(level = "debug", skip(self, tx))]
    pub fn exec<C: Connector>(self, tx: &Transaction<C>) -> Result<()> {
        run(tx, StatementKind::Custom, self.sql, Vec::new()).map(|_| ())
    }
}

impl SqlStatement for Custom {
    fn kind(&self) -> StatementKind {
        StatementKind::Custom
    }

    fn build_query(&self, _dialect: Dialect) -> Result<String> {
        Ok(self.sql.clone())
    }
}
