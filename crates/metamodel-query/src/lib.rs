//! Typed SQL expressions, dialect compiler and statement builders.
//!
//! `metamodel-query` turns metadata from `metamodel-core` into SQL:
//!
//! - [`expr`]: immutable, shareable expression trees and typed [`Column`]
//!   handles
//! - [`walker`]: the traversal every compiler goes through
//! - [`compiler`]: SQL rendering for each [`Dialect`](metamodel_core::Dialect)
//! - [`builder`]: `Select`, `Insert`, `Update`, `Delete` and `Custom`
//! - [`result`]: the lazy [`ResultSet`] returned by `Select::exec`

pub mod builder;
pub mod compiler;
pub mod expr;
pub mod result;
pub mod walker;

pub use builder::{Custom, Delete, Insert, JoinKind, Select, SqlStatement, Update};
pub use compiler::{SqlCompiler, compile};
pub use expr::{
    Assignment, BinaryOp, Column, ColumnRef, Comparator, Connective, Expr, ExprNode, IntoExpr,
    UnaryOp,
};
pub use result::ResultSet;
pub use walker::{AstHandler, walk};
