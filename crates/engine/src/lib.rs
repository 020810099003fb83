//! Evaluation core of a two-dimensional spreadsheet.
//!
//! Cells hold nothing, literal text, or a parsed formula. Edits maintain a
//! bidirectional dependency graph, reject cycles before committing, and
//! invalidate cached values transitively; formulas evaluate on demand
//! against the grid.

pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod position;
pub mod sheet;

#[cfg(test)]
pub mod harness;
