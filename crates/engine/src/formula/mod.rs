//! Parsed formula expressions.
//!
//! [`Formula`] owns the AST for one cell: parse once, evaluate against a
//! reference resolver, print the canonical text, enumerate references.

pub mod eval;
pub mod parser;

use rustc_hash::FxHashSet;

use crate::error::{FormulaError, Result, SheetError};
use crate::position::Position;

use parser::Expr;

/// A parsed formula expression.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Parse expression text (without the leading `=`).
    pub fn parse(expression: &str) -> Result<Formula> {
        let expr = parser::parse(expression).map_err(SheetError::FormulaSyntax)?;
        Ok(Formula { expr })
    }

    /// Evaluate against a resolver that supplies referenced cell values.
    pub fn evaluate<F>(&self, resolve: F) -> std::result::Result<f64, FormulaError>
    where
        F: Fn(Position) -> std::result::Result<f64, FormulaError>,
    {
        eval::evaluate(&self.expr, &resolve)
    }

    /// Canonical expression text (without the leading `=`).
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Distinct valid references, in first-occurrence source order.
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut raw = Vec::new();
        self.expr.collect_cells(&mut raw);

        let mut seen = FxHashSet::default();
        raw.into_iter()
            .filter(|cell| cell.is_valid() && seen.insert(*cell))
            .collect()
    }
}
