//! Immutable SQL expression trees.
//!
//! An [`Expr`] is a shared handle to an [`ExprNode`]. Combinators always
//! build new nodes; existing nodes are never modified, so one sub-expression
//! can be reused by any number of statements.
//!
//! ```ignore
//! let name = Column::<Person, String>::new(&meta, "name")?;
//! let age = Column::<Person, Nullable<i32>>::new(&meta, "age")?;
//! let cond = name.like("A%") & (age.gt(18) | age.is_null());
//! ```

use metamodel_core::{
    DateTime, Error, FieldType, FieldValue, MetaField, MetaObject, Object, Registry, Result,
    TypeKey, UsageErrorKind, Value,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Comparison operators of relational where-clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A column of a described object.
#[derive(Clone)]
pub struct ColumnRef {
    meta: Arc<MetaObject>,
    index: usize,
}

impl ColumnRef {
    /// Look up a column field by exact name.
    pub fn new(meta: &Arc<MetaObject>, name: &str) -> Result<Self> {
        let index = meta
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| {
                Error::usage(
                    UsageErrorKind::ObjectMismatch,
                    format!("{} has no field '{}'", meta.name(), name),
                )
            })?;
        if !meta.fields()[index].is_column() {
            return Err(Error::usage(
                UsageErrorKind::ObjectMismatch,
                format!("{}.{} is not a column", meta.name(), name),
            ));
        }
        Ok(Self {
            meta: Arc::clone(meta),
            index,
        })
    }

    pub fn meta(&self) -> &Arc<MetaObject> {
        &self.meta
    }

    pub fn field(&self) -> &MetaField {
        &self.meta.fields()[self.index]
    }

    pub fn table(&self) -> &'static str {
        self.meta.table_name()
    }

    pub fn name(&self) -> &'static str {
        self.field().name()
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table(), self.name())
    }
}

/// Node kinds of the expression tree.
#[derive(Debug)]
pub enum ExprNode {
    Column(ColumnRef),
    Literal(Value),
    Null,
    Unary {
        op: UnaryOp,
        operand: Expr,
    },
    Binary {
        op: BinaryOp,
        left: Expr,
        right: Expr,
    },
    Cast {
        target: FieldType,
        operand: Expr,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    Relational {
        left: Expr,
        op: Comparator,
        right: Expr,
    },
    Logical {
        connective: Connective,
        children: Vec<Expr>,
    },
    Conditional {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Expr>,
    },
}

/// Shared handle to an immutable expression node.
#[derive(Debug, Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    fn from_node(node: ExprNode) -> Self {
        Expr(Arc::new(node))
    }

    pub fn node(&self) -> &ExprNode {
        &self.0
    }

    /// Whether both handles share the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn column(column: ColumnRef) -> Self {
        Self::from_node(ExprNode::Column(column))
    }

    /// A literal; `Value::Null` becomes the `Null` node.
    pub fn literal(value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::null(),
            value => Self::from_node(ExprNode::Literal(value)),
        }
    }

    pub fn null() -> Self {
        Self::from_node(ExprNode::Null)
    }

    pub fn function(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::from_node(ExprNode::FunctionCall {
            name: name.into(),
            args: args.into_iter().collect(),
        })
    }

    /// `CASE WHEN c1 THEN r1 ... [ELSE otherwise] END`
    pub fn case(
        branches: impl IntoIterator<Item = (Expr, Expr)>,
        otherwise: Option<Expr>,
    ) -> Self {
        Self::from_node(ExprNode::Conditional {
            branches: branches.into_iter().collect(),
            otherwise,
        })
    }

    pub fn cast(self, target: FieldType) -> Self {
        Self::from_node(ExprNode::Cast {
            target,
            operand: self,
        })
    }

    fn unary(self, op: UnaryOp) -> Self {
        Self::from_node(ExprNode::Unary { op, operand: self })
    }

    fn binary(self, op: BinaryOp, right: impl IntoExpr) -> Self {
        Self::from_node(ExprNode::Binary {
            op,
            left: self,
            right: right.into_expr(),
        })
    }

    fn compare(self, op: Comparator, right: impl IntoExpr) -> Self {
        Self::from_node(ExprNode::Relational {
            left: self,
            op,
            right: right.into_expr(),
        })
    }

    pub fn eq(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Eq, right)
    }

    pub fn ne(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Ne, right)
    }

    pub fn lt(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Lt, right)
    }

    pub fn le(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Le, right)
    }

    pub fn gt(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Gt, right)
    }

    pub fn ge(self, right: impl IntoExpr) -> Self {
        self.compare(Comparator::Ge, right)
    }

    pub fn like(self, pattern: impl IntoExpr) -> Self {
        self.compare(Comparator::Like, pattern)
    }

    pub fn is_null(self) -> Self {
        self.compare(Comparator::Eq, Expr::null())
    }

    pub fn is_not_null(self) -> Self {
        self.compare(Comparator::Ne, Expr::null())
    }

    pub fn and(self, other: impl IntoExpr) -> Self {
        self.combine(Connective::And, other.into_expr())
    }

    pub fn or(self, other: impl IntoExpr) -> Self {
        self.combine(Connective::Or, other.into_expr())
    }

    // Children of the same connective are spliced in, so `a & b & c` is one
    // three-way node rather than a nested pair.
    fn combine(self, connective: Connective, other: Expr) -> Self {
        let mut children = Vec::new();
        for part in [self, other] {
            match part.node() {
                ExprNode::Logical {
                    connective: c,
                    children: inner,
                } if *c == connective => children.extend(inner.iter().cloned()),
                _ => children.push(part),
            }
        }
        Self::from_node(ExprNode::Logical {
            connective,
            children,
        })
    }

    pub fn lower(self) -> Self {
        Self::function("lower", [self])
    }

    pub fn upper(self) -> Self {
        Self::function("upper", [self])
    }

    pub fn length(self) -> Self {
        Self::function("length", [self])
    }

    pub fn abs(self) -> Self {
        Self::function("abs", [self])
    }

    pub fn coalesce(self, fallback: impl IntoExpr) -> Self {
        Self::function("coalesce", [self, fallback.into_expr()])
    }
}

/// Conversion into an expression operand.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for Value {
    fn into_expr(self) -> Expr {
        Expr::literal(self)
    }
}

macro_rules! literal_into_expr {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::literal(self)
                }
            }
        )+
    };
}

literal_into_expr!(bool, i32, u32, i64, u64, f32, f64, String, &str, DateTime);

impl<T: Into<Value>> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        self.map_or_else(Expr::null, Expr::literal)
    }
}

macro_rules! arithmetic {
    ($($trait:ident $method:ident => $op:ident),+ $(,)?) => {
        $(
            impl<R: IntoExpr> std::ops::$trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )+
    };
}

arithmetic! {
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => Div,
    Rem rem => Rem,
}

impl<R: IntoExpr> std::ops::BitAnd<R> for Expr {
    type Output = Expr;

    fn bitand(self, rhs: R) -> Expr {
        self.and(rhs)
    }
}

impl<R: IntoExpr> std::ops::BitOr<R> for Expr {
    type Output = Expr;

    fn bitor(self, rhs: R) -> Expr {
        self.or(rhs)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.unary(UnaryOp::Not)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}

// ============================================================================
// Typed columns
// ============================================================================

/// A column of object type `T` whose Rust field type is `F`.
///
/// Creation checks the pairing against the metadata, so an assignment built
/// from a `Column<T, F>` always targets a field of `T`.
pub struct Column<T, F> {
    column: ColumnRef,
    expr: Expr,
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T: Object, F: FieldValue> Column<T, F> {
    pub fn new(meta: &Arc<MetaObject>, name: &str) -> Result<Self> {
        if meta.type_key().id != TypeKey::of::<T>().id {
            return Err(Error::usage(
                UsageErrorKind::ObjectMismatch,
                format!(
                    "{} does not describe {}",
                    meta.name(),
                    std::any::type_name::<T>()
                ),
            ));
        }
        let column = ColumnRef::new(meta, name)?;
        let field = column.field();
        let enum_storage = F::FIELD_TYPE == FieldType::Uint32
            && field.field_type() == FieldType::Enum
            && field.enum_descriptor().is_some();
        if (field.field_type() != F::FIELD_TYPE && !enum_storage)
            || field.nullable_depth() != F::nullable_depth()
        {
            return Err(Error::usage(
                UsageErrorKind::ObjectMismatch,
                format!(
                    "{}.{} is not of type {}",
                    meta.name(),
                    name,
                    std::any::type_name::<F>()
                ),
            ));
        }
        Ok(Self {
            expr: Expr::column(column.clone()),
            column,
            _marker: PhantomData,
        })
    }

    /// Resolve `T` through the registry.
    pub fn of(registry: &Registry, name: &str) -> Result<Self> {
        Self::new(registry.meta_of::<T>()?, name)
    }

    pub fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    pub fn expr(&self) -> Expr {
        self.expr.clone()
    }

    /// `column = value`
    pub fn assign(&self, value: F) -> Assignment<T> {
        self.assign_expr(Expr::literal(value.to_value()))
    }

    /// `column = <expression>`
    pub fn assign_expr(&self, rhs: impl IntoExpr) -> Assignment<T> {
        Assignment {
            column: self.column_ref().clone(),
            value: AssignedValue::Expr(rhs.into_expr()),
            _marker: PhantomData,
        }
    }

    /// `column = <current value of the record>`, read when the statement runs.
    pub fn assign_current(&self) -> Assignment<T> {
        Assignment::current(self.column.clone())
    }

    pub fn eq(&self, right: impl IntoExpr) -> Expr {
        self.expr().eq(right)
    }

    pub fn ne(&self, right: impl IntoExpr) -> Expr {
        self.expr().ne(right)
    }

    pub fn lt(&self, right: impl IntoExpr) -> Expr {
        self.expr().lt(right)
    }

    pub fn le(&self, right: impl IntoExpr) -> Expr {
        self.expr().le(right)
    }

    pub fn gt(&self, right: impl IntoExpr) -> Expr {
        self.expr().gt(right)
    }

    pub fn ge(&self, right: impl IntoExpr) -> Expr {
        self.expr().ge(right)
    }

    pub fn like(&self, pattern: impl IntoExpr) -> Expr {
        self.expr().like(pattern)
    }

    pub fn is_null(&self) -> Expr {
        self.expr().is_null()
    }

    pub fn is_not_null(&self) -> Expr {
        self.expr().is_not_null()
    }
}

impl<T, F> Clone for Column<T, F> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            expr: self.expr.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, F> fmt::Debug for Column<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.expr).finish()
    }
}

impl<T, F> IntoExpr for Column<T, F> {
    fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T, F> IntoExpr for &Column<T, F> {
    fn into_expr(self) -> Expr {
        self.expr.clone()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum AssignedValue {
    Expr(Expr),
    Current,
}

/// `column = value` for a column of `T`; the payload of `Update::set`.
#[derive(Debug, Clone)]
pub struct Assignment<T> {
    pub(crate) column: ColumnRef,
    pub(crate) value: AssignedValue,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Assignment<T> {
    pub(crate) fn current(column: ColumnRef) -> Self {
        Self {
            column,
            value: AssignedValue::Current,
            _marker: PhantomData,
        }
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }
}
