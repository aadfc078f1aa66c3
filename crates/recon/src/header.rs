//! Header-row detection and column resolution for loosely structured sheets.
//!
//! Uploaded sheets often carry title or banner rows above the real header,
//! so the header is located by scoring rows against synonym groups instead of
//! assuming row 1.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::ReconError;
use crate::grid::Sheet;
use crate::model::{PhysicalField, SapField, Source};
use crate::normalize::{normalize_cell, normalize_text};

/// Rows scanned when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 30;

/// A set of logical columns that can be located by synonyms.
pub trait Field: Copy + Eq + Hash + std::fmt::Debug {
    fn field_name(self) -> &'static str;
}

impl Field for PhysicalField {
    fn field_name(self) -> &'static str {
        self.name()
    }
}

impl Field for SapField {
    fn field_name(self) -> &'static str {
        self.name()
    }
}

// ---------------------------------------------------------------------------
// Synonym table
// ---------------------------------------------------------------------------

/// Field → accepted spellings, normalized once at construction.
#[derive(Debug, Clone)]
pub struct SynonymTable<F> {
    fields: Vec<F>,
    groups: Vec<Vec<String>>,
}

impl<F: Field> SynonymTable<F> {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (F, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        let mut groups = Vec::new();
        for (field, names) in entries {
            let mut group: Vec<String> = Vec::new();
            for name in names {
                let n = normalize_text(name.as_ref());
                if !n.is_empty() && !group.contains(&n) {
                    group.push(n);
                }
            }
            fields.push(field);
            groups.push(group);
        }
        Self { fields, groups }
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    pub fn synonyms(&self, field: F) -> &[String] {
        self.fields
            .iter()
            .position(|f| *f == field)
            .map(|i| self.groups[i].as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &[String])> {
        self.fields.iter().copied().zip(self.groups.iter().map(Vec::as_slice))
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Pick the header row among the first [`HEADER_SCAN_ROWS`] rows.
///
/// A row's score is the number of distinct groups with a member equal to one
/// of its normalized cells. The first row reaching `min_score` wins
/// immediately; otherwise the best-scoring row (earliest on ties, row 1 if
/// nothing scored) is returned.
pub fn detect_header_row(sheet: &Sheet, groups: &[Vec<String>], min_score: usize) -> usize {
    let max_scan = HEADER_SCAN_ROWS.min(sheet.row_count());
    let mut best_row = 1;
    let mut best_score = 0;

    for r in 1..=max_scan {
        let cells = sheet.row(r);
        if cells.is_empty() {
            continue;
        }

        let mut seen = vec![false; groups.len()];
        for cell in cells {
            let v = normalize_cell(cell);
            if v.is_empty() {
                continue;
            }
            for (idx, syns) in groups.iter().enumerate() {
                if !seen[idx] && syns.iter().any(|s| *s == v) {
                    seen[idx] = true;
                }
            }
        }

        let score = seen.iter().filter(|s| **s).count();
        if score > best_score {
            best_score = score;
            best_row = r;
        }
        if score >= min_score {
            return r;
        }
    }

    best_row
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// First column (left to right) of `header_row` whose text matches one of `names`.
pub fn resolve_column<S: AsRef<str>>(sheet: &Sheet, header_row: usize, names: &[S]) -> Option<usize> {
    let want: Vec<String> = names.iter().map(|n| normalize_text(n.as_ref())).collect();
    find_column(sheet, header_row, &want)
}

fn find_column(sheet: &Sheet, header_row: usize, normalized: &[String]) -> Option<usize> {
    (1..=sheet.cell_count(header_row)).find(|&c| {
        let v = normalize_cell(sheet.get(header_row, c));
        normalized.iter().any(|w| *w == v)
    })
}

/// Resolved columns of one sheet.
#[derive(Debug, Clone)]
pub struct HeaderMap<F> {
    pub header_row: usize,
    columns: HashMap<F, usize>,
}

impl<F: Field> HeaderMap<F> {
    /// Detect the header row and resolve every field of the table against it.
    pub fn detect(sheet: &Sheet, table: &SynonymTable<F>, min_score: usize) -> Self {
        let header_row = detect_header_row(sheet, table.groups(), min_score);
        Self::resolve(sheet, header_row, table)
    }

    pub fn resolve(sheet: &Sheet, header_row: usize, table: &SynonymTable<F>) -> Self {
        let columns = table
            .iter()
            .filter_map(|(field, syns)| find_column(sheet, header_row, syns).map(|c| (field, c)))
            .collect();
        Self { header_row, columns }
    }

    pub fn get(&self, field: F) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Column of a field the run cannot do without.
    pub fn require(&self, field: F, source: Source) -> Result<usize, ReconError> {
        self.get(field).ok_or_else(|| ReconError::MissingColumn {
            source,
            field: field.field_name().to_string(),
        })
    }

    /// Return the field's column, appending it after the last header cell
    /// with `label` when the sheet does not have one.
    pub fn ensure_column(&mut self, sheet: &mut Sheet, field: F, label: &str) -> usize {
        if let Some(col) = self.get(field) {
            return col;
        }
        let col = sheet.cell_count(self.header_row) + 1;
        sheet.set(self.header_row, col, label);
        self.columns.insert(field, col);
        log::info!(
            "sheet '{}': added column '{}' at {} for {}",
            sheet.name,
            label,
            col,
            field.field_name()
        );
        col
    }

    /// First data row (the row below the header).
    pub fn first_data_row(&self) -> usize {
        self.header_row + 1
    }
}
