//! SQL text rendering of expression trees.

use crate::expr::{BinaryOp, ColumnRef, Comparator, Connective, Expr, UnaryOp};
use crate::walker::{AstHandler, walk};
use metamodel_core::{Dialect, FieldType, Result, Value};

/// [`AstHandler`] producing SQL for one dialect.
///
/// Literals are rendered inline through [`Dialect::format_literal`].
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    dialect: Dialect,
    qualify: bool,
}

impl SqlCompiler {
    /// Compiler rendering columns as `"table"."column"`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            qualify: true,
        }
    }

    /// Compiler rendering bare column names, as in the left side of `SET`.
    pub fn unqualified(dialect: Dialect) -> Self {
        Self {
            dialect,
            qualify: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compile(&mut self, expr: &Expr) -> Result<String> {
        walk(expr, self)
    }
}

/// Compile `expr` with qualified column names.
pub fn compile(expr: &Expr, dialect: Dialect) -> Result<String> {
    SqlCompiler::new(dialect).compile(expr)
}

impl AstHandler for SqlCompiler {
    fn column(&mut self, column: &ColumnRef) -> Result<String> {
        Ok(if self.qualify {
            self.dialect.qualified(column.table(), column.name())
        } else {
            self.dialect.quote_identifier(column.name())
        })
    }

    fn literal(&mut self, value: &Value) -> Result<String> {
        self.dialect.format_literal(value)
    }

    fn null(&mut self) -> Result<String> {
        Ok("NULL".to_string())
    }

    fn unary_operator(&mut self, op: UnaryOp) -> Result<String> {
        Ok(match op {
            UnaryOp::Not => "NOT",
            UnaryOp::Neg => "-",
        }
        .to_string())
    }

    fn cast(&mut self, target: FieldType) -> Result<String> {
        self.dialect.cast_type(target).map(str::to_string)
    }

    fn binary_operator(&mut self, op: BinaryOp) -> Result<String> {
        Ok(match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
        .to_string())
    }

    fn function_call(&mut self, name: &str, _arity: usize) -> Result<String> {
        Ok(self.dialect.function_name(name))
    }

    fn relational(&mut self, op: Comparator, right_is_null: bool) -> Result<String> {
        Ok(match (op, right_is_null) {
            (Comparator::Eq, true) => "IS",
            (Comparator::Ne, true) => "IS NOT",
            (Comparator::Eq, false) => "=",
            (Comparator::Ne, false) => "<>",
            (Comparator::Lt, _) => "<",
            (Comparator::Le, _) => "<=",
            (Comparator::Gt, _) => ">",
            (Comparator::Ge, _) => ">=",
            (Comparator::Like, _) => "LIKE",
        }
        .to_string())
    }

    fn logical(&mut self, connective: Connective) -> Result<String> {
        Ok(match connective {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
        .to_string())
    }

    fn conditional(&mut self, _branches: usize) -> Result<()> {
        Ok(())
    }
}
