//! Error types for sheet operations and formula evaluation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by `Sheet` operations.
///
/// Every variant is fatal to the call that produced it and leaves the sheet
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// The supplied position lies outside the 16384×16384 grid.
    #[error("invalid cell position")]
    InvalidPosition,

    /// The formula text was rejected by the parser.
    #[error("formula syntax error: {0}")]
    FormulaSyntax(String),

    /// Installing the edit would close a reference cycle.
    #[error("circular dependency")]
    CircularDependency,
}

pub type Result<T> = std::result::Result<T, SheetError>;

/// Typed evaluation error, visible as a formula cell's value.
///
/// Unlike [`SheetError`] this is not propagated out of sheet operations as
/// an `Err`; it travels inside `CellValue::Error` and prints as the
/// worksheet error literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    /// A reference points outside the grid.
    Ref,
    /// A referenced cell holds text that is not numeric.
    Value,
    /// Division by zero, or arithmetic left the finite range.
    Div0,
}

impl FormulaError {
    /// The worksheet error literal.
    pub fn message(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#ARITHM!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for FormulaError {}
