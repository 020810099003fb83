// Formula evaluator - walks the parsed expression against a reference resolver.

use crate::error::FormulaError;
use crate::position::Position;

use super::parser::{Expr, Op, UnaryOp};

/// Evaluate an expression tree.
///
/// `resolve` supplies the numeric value of a referenced cell, or the typed
/// error that reading it produces. Arithmetic whose result leaves the finite
/// `f64` range (division by zero included) yields [`FormulaError::Div0`].
/// The first error aborts the walk and becomes the result.
pub fn evaluate<F>(expr: &Expr, resolve: &F) -> Result<f64, FormulaError>
where
    F: Fn(Position) -> Result<f64, FormulaError>,
{
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(cell) => resolve(*cell),
        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand, resolve)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        Expr::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, resolve)?;
            let rhs = evaluate(right, resolve)?;
            let value = match op {
                Op::Add => lhs + rhs,
                Op::Sub => lhs - rhs,
                Op::Mul => lhs * rhs,
                Op::Div => lhs / rhs,
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(FormulaError::Div0)
            }
        }
    }
}
