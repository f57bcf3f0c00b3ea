//! SQL dialects and their lexical differences.

use crate::error::{DataErrorKind, Error, Result};
use crate::types::FieldType;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// SQL dialect for generating statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL (uses $1, $2, ... placeholders)
    #[default]
    Postgres,
    /// SQLite (uses ?1, ?2, ... placeholders)
    Sqlite,
    /// MySQL (uses ? placeholders)
    Mysql,
    /// SQL Server (uses @p1, @p2, ... placeholders)
    Mssql,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
            Dialect::Mssql => format!("@p{index}"),
        }
    }

    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
            Dialect::Mssql => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// `table.column`, both quoted.
    pub fn qualified(self, table: &str, column: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    fn quote_string(self, text: &str) -> String {
        let escaped = text.replace('\'', "''");
        match self {
            Dialect::Mysql => format!("'{}'", escaped.replace('\\', "\\\\")),
            Dialect::Mssql => format!("N'{}'", escaped),
            Dialect::Postgres | Dialect::Sqlite => format!("'{}'", escaped),
        }
    }

    /// Render a value as an inline SQL literal.
    pub fn format_literal(self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                Dialect::Postgres | Dialect::Mysql => (if *b { "TRUE" } else { "FALSE" }).to_string(),
                Dialect::Sqlite | Dialect::Mssql => (if *b { "1" } else { "0" }).to_string(),
            },
            Value::Int32(v) => v.to_string(),
            Value::Uint32(v) | Value::Enum(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float(v) => finite(f64::from(*v))?,
            Value::Double(v) => finite(*v)?,
            Value::String(s) => self.quote_string(s),
            Value::DateTime(dt) => {
                let text = dt.to_string();
                match self {
                    Dialect::Sqlite => format!("'{}'", text),
                    Dialect::Postgres | Dialect::Mysql => format!("TIMESTAMP '{}'", text),
                    Dialect::Mssql => format!("CONVERT(DATETIME2, '{}', 120)", text),
                }
            }
            Value::Object(_) | Value::Array(_) => {
                let field_type = value.field_type().unwrap_or(FieldType::Object);
                return Err(Error::data(
                    DataErrorKind::UnsupportedType(field_type),
                    format!("{} values have no SQL literal form", field_type),
                ));
            }
        })
    }

    /// Target type name for `CAST(x AS type)`.
    pub fn cast_type(self, field_type: FieldType) -> Result<&'static str> {
        use FieldType as F;
        let name = match (self, field_type) {
            (Dialect::Sqlite, F::Bool | F::Int32 | F::Uint32 | F::Int64 | F::Uint64 | F::Enum) => {
                "INTEGER"
            }
            (Dialect::Sqlite, F::Float | F::Double) => "REAL",
            (Dialect::Sqlite, F::String | F::DateTime) => "TEXT",

            (Dialect::Postgres, F::Bool) => "BOOLEAN",
            (Dialect::Postgres, F::Int32) => "INTEGER",
            (Dialect::Postgres, F::Uint32 | F::Int64 | F::Enum) => "BIGINT",
            (Dialect::Postgres, F::Uint64) => "NUMERIC(20)",
            (Dialect::Postgres, F::Float) => "REAL",
            (Dialect::Postgres, F::Double) => "DOUBLE PRECISION",
            (Dialect::Postgres, F::String) => "TEXT",
            (Dialect::Postgres, F::DateTime) => "TIMESTAMP",

            (Dialect::Mysql, F::Bool | F::Int32 | F::Int64) => "SIGNED",
            (Dialect::Mysql, F::Uint32 | F::Uint64 | F::Enum) => "UNSIGNED",
            (Dialect::Mysql, F::Float) => "FLOAT",
            (Dialect::Mysql, F::Double) => "DOUBLE",
            (Dialect::Mysql, F::String) => "CHAR",
            (Dialect::Mysql, F::DateTime) => "DATETIME",

            (Dialect::Mssql, F::Bool) => "BIT",
            (Dialect::Mssql, F::Int32) => "INT",
            (Dialect::Mssql, F::Uint32 | F::Int64 | F::Enum) => "BIGINT",
            (Dialect::Mssql, F::Uint64) => "DECIMAL(20, 0)",
            (Dialect::Mssql, F::Float) => "REAL",
            (Dialect::Mssql, F::Double) => "FLOAT",
            (Dialect::Mssql, F::String) => "NVARCHAR(MAX)",
            (Dialect::Mssql, F::DateTime) => "DATETIME2",

            (_, F::Object | F::Array | F::Variant) => {
                return Err(Error::data(
                    DataErrorKind::UnsupportedType(field_type),
                    format!("cannot cast to {}", field_type),
                ));
            }
        };
        Ok(name)
    }

    /// Dialect spelling of a SQL function.
    pub fn function_name(self, name: &str) -> String {
        let upper = name.to_ascii_uppercase();
        match (self, upper.as_str()) {
            (Dialect::Mssql, "LENGTH") => "LEN".to_string(),
            _ => upper,
        }
    }

    /// Pagination suffix, including its leading space. SQL Server needs an
    /// ORDER BY for OFFSET/FETCH; `has_order` tells whether one was emitted.
    pub fn limit_offset(self, limit: Option<u64>, offset: Option<u64>, has_order: bool) -> String {
        let mut sql = String::new();
        match self {
            Dialect::Postgres => {
                if let Some(limit) = limit {
                    sql.push_str(&format!(" LIMIT {}", limit));
                }
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {}", offset));
                }
            }
            Dialect::Sqlite | Dialect::Mysql => {
                let unbounded = if self == Dialect::Sqlite {
                    "-1".to_string()
                } else {
                    u64::MAX.to_string()
                };
                match (limit, offset) {
                    (Some(limit), Some(offset)) => {
                        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
                    }
                    (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
                    (None, Some(offset)) => {
                        sql.push_str(&format!(" LIMIT {} OFFSET {}", unbounded, offset));
                    }
                    (None, None) => {}
                }
            }
            Dialect::Mssql => {
                if limit.is_none() && offset.is_none() {
                    return sql;
                }
                if !has_order {
                    sql.push_str(" ORDER BY (SELECT NULL)");
                }
                sql.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
                if let Some(limit) = limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
            }
        }
        sql
    }

    /// INSERT for a row with no explicit columns.
    pub fn insert_default_values(self, table: &str) -> String {
        match self {
            Dialect::Mysql => format!("INSERT INTO {} () VALUES ()", table),
            _ => format!("INSERT INTO {} DEFAULT VALUES", table),
        }
    }
}

fn finite(v: f64) -> Result<String> {
    if v.is_finite() {
        Ok(v.to_string())
    } else {
        Err(Error::data(
            DataErrorKind::FormatError,
            format!("{} has no SQL literal form", v),
        ))
    }
}
