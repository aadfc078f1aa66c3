//! In-memory tabular model handed to the engine by the reader and back to the writer.
//!
//! Rows and columns are 1-indexed. Rows keep their own width, so a row only
//! materializes the cells up to its last written column.

use std::fmt;

static EMPTY: CellValue = CellValue::Empty;

/// A single cell as delivered by the tabular reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet date serial (1900 system).
    Date(f64),
    /// Formula text plus the cached result computed by the producing application.
    Formula { formula: String, cached: Box<CellValue> },
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn formula(formula: impl Into<String>, cached: CellValue) -> Self {
        // A formula never caches another formula.
        let cached = match cached {
            Self::Formula { cached, .. } => *cached,
            other => other,
        };
        Self::Formula { formula: formula.into(), cached: Box::new(cached) }
    }

    /// The value the cell displays: the cached result for formulas, the cell itself otherwise.
    pub fn effective(&self) -> &CellValue {
        match self {
            Self::Formula { cached, .. } => cached,
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.effective() {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render the effective value as text.
    pub fn as_text(&self) -> String {
        match self.effective() {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) | Self::Date(n) => format_number(*n),
            Self::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
            Self::Formula { .. } => String::new(),
        }
    }

    /// Numeric value of the cell. Anything that is not a finite number reads as zero.
    pub fn as_quantity(&self) -> f64 {
        let n = match self.effective() {
            Self::Number(n) | Self::Date(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        if n.is_finite() { n } else { 0.0 }
    }

    /// Drop the formula and keep only its cached result.
    pub fn to_plain(&self) -> CellValue {
        self.effective().clone()
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Integers print without decimals.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), rows: Vec::new() }
    }

    /// Build a sheet from row vectors; trailing empty cells are trimmed per row.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Self::new(name);
        for row in rows {
            sheet.push_row(row);
        }
        sheet
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of materialized cells in `row` (0 for rows past the end).
    pub fn cell_count(&self, row: usize) -> usize {
        row.checked_sub(1)
            .and_then(|r| self.rows.get(r))
            .map_or(0, |cells| cells.len())
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    /// Trimmed text of a cell; an unresolved column reads as empty.
    pub fn text_at(&self, row: usize, col: Option<usize>) -> String {
        col.map(|c| self.get(row, c).as_text().trim().to_string())
            .unwrap_or_default()
    }

    /// Write a cell, growing the grid as needed. Writes to row or column 0 are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize_with(col, CellValue::default);
        }
        cells[col - 1] = value.into();
    }

    /// Remove a row, shifting the following rows up.
    pub fn delete_row(&mut self, row: usize) {
        if row >= 1 && row <= self.rows.len() {
            self.rows.remove(row - 1);
        }
    }

    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        while matches!(cells.last(), Some(CellValue::Empty)) {
            cells.pop();
        }
        self.rows.push(cells);
    }

    /// Cells of a row (empty slice past the end).
    pub fn row(&self, row: usize) -> &[CellValue] {
        row.checked_sub(1)
            .and_then(|r| self.rows.get(r))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn first_sheet_name(&self) -> Option<&str> {
        self.sheets.first().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_based_access_and_growth() {
        let mut sheet = Sheet::new("S");
        sheet.set(2, 3, "x");
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell_count(1), 0);
        assert_eq!(sheet.cell_count(2), 3);
        assert_eq!(sheet.get(2, 3).as_text(), "x");
        assert_eq!(sheet.get(2, 1), &CellValue::Empty);
        assert_eq!(sheet.get(0, 1), &CellValue::Empty);
        assert_eq!(sheet.get(9, 9), &CellValue::Empty);
    }

    #[test]
    fn delete_row_shifts_up() {
        let mut sheet = Sheet::from_rows(
            "S",
            vec![vec!["a".into()], vec!["b".into()], vec!["c".into()]],
        );
        sheet.delete_row(2);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.get(2, 1).as_text(), "c");
        sheet.delete_row(7);
        assert_eq!(sheet.row_count(), 2);
    }

    #[test]
    fn formula_uses_cached_value() {
        let cell = CellValue::formula("SUM(A1:A2)", CellValue::Number(42.0));
        assert_eq!(cell.as_text(), "42");
        assert_eq!(cell.as_quantity(), 42.0);
        assert_eq!(cell.to_plain(), CellValue::Number(42.0));
    }

    #[test]
    fn quantity_coercion_is_lenient() {
        assert_eq!(CellValue::text(" 12.5 ").as_quantity(), 12.5);
        assert_eq!(CellValue::text("doze").as_quantity(), 0.0);
        assert_eq!(CellValue::Empty.as_quantity(), 0.0);
        assert_eq!(CellValue::Bool(true).as_quantity(), 0.0);
        assert_eq!(CellValue::Number(f64::NAN).as_quantity(), 0.0);
        assert_eq!(CellValue::formula("X()", CellValue::Empty).as_quantity(), 0.0);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(CellValue::Number(100.0).as_text(), "100");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
    }

    #[test]
    fn trailing_empties_trimmed_on_push() {
        let sheet = Sheet::from_rows("S", vec![vec!["a".into(), CellValue::Empty, CellValue::Empty]]);
        assert_eq!(sheet.cell_count(1), 1);
    }
}
