//! Exhaustive traversal of expression trees.
//!
//! [`walk`] visits every node once and calls the matching [`AstHandler`]
//! method for it. Handlers only supply the text of each node's own token
//! (a quoted column, a literal, an operator); the walker decides order,
//! spacing and parenthesisation, so every compiler renders the same shape.

use crate::expr::{BinaryOp, ColumnRef, Comparator, Connective, Expr, ExprNode, UnaryOp};
use metamodel_core::{FieldType, Result, Value};

/// Per-node-kind rendering hooks.
pub trait AstHandler {
    fn column(&mut self, column: &ColumnRef) -> Result<String>;

    fn literal(&mut self, value: &Value) -> Result<String>;

    fn null(&mut self) -> Result<String>;

    fn unary_operator(&mut self, op: UnaryOp) -> Result<String>;

    /// Target type name of a cast.
    fn cast(&mut self, target: FieldType) -> Result<String>;

    fn binary_operator(&mut self, op: BinaryOp) -> Result<String>;

    /// Function name as rendered, given the number of arguments.
    fn function_call(&mut self, name: &str, arity: usize) -> Result<String>;

    /// Comparison token; `right_is_null` is set when comparing against `NULL`.
    fn relational(&mut self, op: Comparator, right_is_null: bool) -> Result<String>;

    fn logical(&mut self, connective: Connective) -> Result<String>;

    /// Called once per `CASE` expression before its branches are rendered.
    fn conditional(&mut self, branches: usize) -> Result<()>;
}

/// Render `expr` through `handler`.
pub fn walk(expr: &Expr, handler: &mut dyn AstHandler) -> Result<String> {
    match expr.node() {
        ExprNode::Column(column) => handler.column(column),
        ExprNode::Literal(value) => handler.literal(value),
        ExprNode::Null => handler.null(),
        ExprNode::Unary { op, operand } => {
            let token = handler.unary_operator(*op)?;
            let operand = walk_operand(operand, handler)?;
            if token.ends_with(|c: char| c.is_ascii_alphabetic()) {
                Ok(format!("{} {}", token, operand))
            } else if operand.starts_with(['-', '+']) {
                // `--` would open a line comment
                Ok(format!("{}({})", token, operand))
            } else {
                Ok(format!("{}{}", token, operand))
            }
        }
        ExprNode::Cast { target, operand } => {
            let type_name = handler.cast(*target)?;
            let operand = walk(operand, handler)?;
            Ok(format!("CAST({} AS {})", operand, type_name))
        }
        ExprNode::Binary { op, left, right } => {
            let token = handler.binary_operator(*op)?;
            let left = walk_operand(left, handler)?;
            let right = walk_operand(right, handler)?;
            Ok(format!("({} {} {})", left, token, right))
        }
        ExprNode::FunctionCall { name, args } => {
            let name = handler.function_call(name, args.len())?;
            let args = args
                .iter()
                .map(|arg| walk(arg, handler))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{}({})", name, args.join(", ")))
        }
        ExprNode::Relational { left, op, right } => {
            let right_is_null = matches!(right.node(), ExprNode::Null);
            let token = handler.relational(*op, right_is_null)?;
            let left = walk_operand(left, handler)?;
            let right = walk_operand(right, handler)?;
            Ok(format!("{} {} {}", left, token, right))
        }
        ExprNode::Logical {
            connective,
            children,
        } => {
            let token = handler.logical(*connective)?;
            let parts = children
                .iter()
                .map(|child| walk_operand(child, handler))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(&format!(" {} ", token)))
        }
        ExprNode::Conditional {
            branches,
            otherwise,
        } => {
            handler.conditional(branches.len())?;
            let mut out = String::from("CASE");
            for (condition, result) in branches {
                out.push_str(" WHEN ");
                out.push_str(&walk(condition, handler)?);
                out.push_str(" THEN ");
                out.push_str(&walk(result, handler)?);
            }
            if let Some(otherwise) = otherwise {
                out.push_str(" ELSE ");
                out.push_str(&walk(otherwise, handler)?);
            }
            out.push_str(" END");
            Ok(out)
        }
    }
}

// Where-clauses used as operands are parenthesised so that the rendered
// text keeps the tree's grouping.
fn walk_operand(expr: &Expr, handler: &mut dyn AstHandler) -> Result<String> {
    let text = walk(expr, handler)?;
    match expr.node() {
        ExprNode::Logical { .. } | ExprNode::Relational { .. } => Ok(format!("({})", text)),
        _ => Ok(text),
    }
}
