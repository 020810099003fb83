//! The sheet: cell storage and the edit surface.
//!
//! Owns every cell in a sparse position-keyed map, plus the dependency graph
//! between them. All mutation funnels through `set_cell`/`clear_cell`, which
//! keep content, graph edges, and value caches in step.

use std::collections::HashMap;
use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::cell::{Cell, CellContent, CellValue};
use crate::dep_graph::DepGraph;
use crate::error::{FormulaError, Result, SheetError};
use crate::position::{Position, Size};

#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    graph: DepGraph,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content of a cell from raw input text.
    ///
    /// Empty text installs empty content; text starting with `=` (and at
    /// least one more character) must parse as a formula; anything else is
    /// stored verbatim as text. Cells the new formula references are created
    /// empty if absent. A parse failure or an edit that would close a
    /// reference cycle rejects the call and leaves the sheet untouched.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }

        let content = CellContent::parse(text)?;
        let new_refs = content.referenced_cells();

        if self.graph.would_create_cycle(pos, &new_refs) {
            log::debug!("rejecting edit at {}: would close a reference cycle", pos);
            return Err(SheetError::CircularDependency);
        }

        // Referenced cells must exist (possibly empty) so dependents resolve
        // through the map.
        for &referenced in &new_refs {
            self.cells.entry(referenced).or_default();
        }

        self.graph
            .replace_edges(pos, new_refs.into_iter().collect::<FxHashSet<_>>());
        self.cells.entry(pos).or_default().set_content(content);
        self.invalidate_dependents(pos);
        Ok(())
    }

    /// The cell at `pos`, if one was ever set or referenced.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.cells.get(&pos))
    }

    /// Clear a cell's content.
    ///
    /// The map entry survives (as empty) while other formulas still
    /// reference it, so they keep resolving to zero; otherwise it is
    /// removed. Clearing an absent cell is a no-op.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        let Some(cell) = self.cells.get_mut(&pos) else {
            return Ok(());
        };

        cell.clear();
        self.graph.clear_cell(pos);
        self.invalidate_dependents(pos);

        if !self.graph.is_referenced(pos) {
            self.cells.remove(&pos);
        }
        Ok(())
    }

    /// Visible value at `pos`. Absent cells read as empty text.
    pub fn value(&self, pos: Position) -> Result<CellValue> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self
            .cells
            .get(&pos)
            .map(|cell| cell.value(self))
            .unwrap_or_else(|| CellValue::Text(String::new())))
    }

    /// Stored text at `pos`. Absent cells read as the empty string.
    pub fn text(&self, pos: Position) -> Result<String> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.cells.get(&pos).map(|cell| cell.text()).unwrap_or_default())
    }

    /// True if some formula references `pos`.
    pub fn is_referenced(&self, pos: Position) -> bool {
        self.graph.is_referenced(pos)
    }

    /// The dependency graph (read-only).
    pub fn dep_graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Iterate over live cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Bounding rectangle of all cells with non-empty stored text.
    ///
    /// Empty cells — including the placeholders kept alive for back
    /// references — never widen the rectangle.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if matches!(cell.content(), CellContent::Empty) {
                continue;
            }
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        size
    }

    /// Print visible values over the printable rectangle, tab-separated,
    /// one line per row.
    pub fn print_values<W: Write>(&self, output: &mut W) -> io::Result<()> {
        self.print_with(output, |cell| cell.value(self).to_display())
    }

    /// Print stored texts over the printable rectangle, tab-separated,
    /// one line per row.
    pub fn print_texts<W: Write>(&self, output: &mut W) -> io::Result<()> {
        self.print_with(output, |cell| cell.text())
    }

    fn print_with<W: Write>(
        &self,
        output: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    output.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    output.write_all(render(cell).as_bytes())?;
                }
            }
            output.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Resolve one reference during formula evaluation.
    ///
    /// Invalid positions are reference errors. Absent and empty cells read
    /// as zero. Text coerces to a number only when the whole visible string
    /// is a numeric literal (the empty string counts as zero). A referenced
    /// formula's own error is passed through unchanged.
    pub(crate) fn resolve_reference(&self, pos: Position) -> std::result::Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(0.0);
        };
        match cell.value(self) {
            CellValue::Number(number) => Ok(number),
            CellValue::Error(error) => Err(error),
            CellValue::Text(text) if text.is_empty() => Ok(0.0),
            CellValue::Text(text) => text.parse::<f64>().map_err(|_| FormulaError::Value),
        }
    }

    /// Reset the cached value of every cell that transitively depends on
    /// `pos`. Called after any content change at `pos`.
    fn invalidate_dependents(&self, pos: Position) {
        let stale = self.graph.transitive_dependents(pos);
        if !stale.is_empty() {
            log::trace!("invalidating {} dependent cache(s) of {}", stale.len(), pos);
        }
        for dependent in stale {
            if let Some(cell) = self.cells.get(&dependent) {
                cell.invalidate_cache();
            }
        }
    }
}
