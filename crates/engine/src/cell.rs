//! Cell content variants and visible values.

use std::cell::RefCell;

use crate::error::{FormulaError, Result};
use crate::formula::Formula;
use crate::position::Position;
use crate::sheet::Sheet;

/// Introduces a formula when followed by at least one more character.
pub const FORMULA_SIGN: char = '=';
/// Marks text that must not be interpreted as a formula.
pub const ESCAPE_SIGN: char = '\'';

/// What a cell holds.
#[derive(Debug, Default)]
pub enum CellContent {
    #[default]
    Empty,
    /// Literal text, stored verbatim (leading apostrophe included).
    Text(String),
    Formula(FormulaCell),
}

impl CellContent {
    /// Classify raw input text.
    ///
    /// Empty input is empty content. Input starting with `=` and at least
    /// two characters long must parse as a formula. Everything else —
    /// including a lone `=` — is literal text.
    pub fn parse(text: &str) -> Result<CellContent> {
        if text.is_empty() {
            Ok(CellContent::Empty)
        } else if text.len() >= 2 && text.starts_with(FORMULA_SIGN) {
            let formula = Formula::parse(&text[1..])?;
            Ok(CellContent::Formula(FormulaCell::new(formula)))
        } else {
            Ok(CellContent::Text(text.to_string()))
        }
    }

    /// Distinct valid positions referenced by this content.
    pub fn referenced_cells(&self) -> Vec<Position> {
        match self {
            CellContent::Formula(formula_cell) => formula_cell.formula.referenced_cells(),
            _ => Vec::new(),
        }
    }
}

/// A formula plus its cached evaluation result.
///
/// The cache sits behind a `RefCell` so that reads through a shared sheet
/// reference can fill it. A populated cache is only trusted while every
/// transitively referenced cell is unchanged; edits reset it.
#[derive(Debug)]
pub struct FormulaCell {
    formula: Formula,
    cache: RefCell<Option<std::result::Result<f64, FormulaError>>>,
}

impl FormulaCell {
    fn new(formula: Formula) -> Self {
        Self {
            formula,
            cache: RefCell::new(None),
        }
    }

    fn value(&self, sheet: &Sheet) -> std::result::Result<f64, FormulaError> {
        if let Some(cached) = *self.cache.borrow() {
            return cached;
        }
        let result = self.formula.evaluate(|cell| sheet.resolve_reference(cell));
        *self.cache.borrow_mut() = Some(result);
        result
    }
}

/// The visible value of a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl CellValue {
    /// Render the value as it appears in printed output.
    pub fn to_display(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => number.to_string(),
            CellValue::Error(error) => error.message().to_string(),
        }
    }
}

/// One cell of the sheet.
///
/// Holds content only; adjacency between cells lives in the sheet's
/// dependency graph, keyed by position.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
}

impl Cell {
    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub(crate) fn set_content(&mut self, content: CellContent) {
        self.content = content;
    }

    pub(crate) fn clear(&mut self) {
        self.content = CellContent::Empty;
    }

    /// The stored text, as if editing the cell: empty for empty content,
    /// verbatim for text (escape retained), `=` plus the canonical
    /// expression for formulas.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula(formula_cell) => {
                format!("{}{}", FORMULA_SIGN, formula_cell.formula.expression())
            }
        }
    }

    /// The visible value.
    ///
    /// Text shows without its escape prefix. Formulas evaluate on demand
    /// against the sheet, caching the result until an edit invalidates it.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Text(String::new()),
            CellContent::Text(text) => {
                let visible = text.strip_prefix(ESCAPE_SIGN).unwrap_or(text);
                CellValue::Text(visible.to_string())
            }
            CellContent::Formula(formula_cell) => match formula_cell.value(sheet) {
                Ok(number) => CellValue::Number(number),
                Err(error) => CellValue::Error(error),
            },
        }
    }

    /// Distinct valid positions referenced by the current content.
    pub fn referenced_cells(&self) -> Vec<Position> {
        self.content.referenced_cells()
    }

    pub(crate) fn invalidate_cache(&self) {
        if let CellContent::Formula(formula_cell) = &self.content {
            formula_cell.cache.borrow_mut().take();
        }
    }

    /// True if a formula result is currently cached.
    pub fn has_cached_value(&self) -> bool {
        match &self.content {
            CellContent::Formula(formula_cell) => formula_cell.cache.borrow().is_some(),
            _ => false,
        }
    }
}
