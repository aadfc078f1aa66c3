use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization as _;

use crate::grid::CellValue;

/// Canonical comparison key: lower-case, accents stripped, every run of
/// characters outside `[A-Za-z0-9_]` collapsed to one space, trimmed.
///
/// `"Qtd. Disponível"` and `"QTD DISPONIVEL"` both become `"qtd disponivel"`.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for ch in input.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Normalize the effective (displayed) value of a cell.
pub fn normalize_cell(value: &CellValue) -> String {
    normalize_text(&value.as_text())
}
