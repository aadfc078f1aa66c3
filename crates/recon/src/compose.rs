use crate::grid::Sheet;

pub const PHYSICAL_OUTPUT_FILE: &str = "ESTOQUE FISICO (analisado).xlsx";
pub const SAP_OUTPUT_FILE: &str = "ESTOQUE SAP (analisado).xlsx";
pub const ZIP_OUTPUT_FILE: &str = "resultado-analise.zip";
pub const SAP_CONSOLIDATED_FILE: &str = "ESTOQUE SAP (consolidado).xlsx";
pub const PLAIN_SAP_SHEET: &str = "SAP";

/// Flattened copy of `sheet` starting at its header row.
///
/// Row 1 is the header, followed by every data row. Formulas are replaced by
/// their cached values; rows above the header are dropped. Rows are copied
/// up to the wider of the sheet and the header row.
pub fn plain_sheet(sheet: &Sheet, header_row: usize, name: &str) -> Sheet {
    let width = sheet.column_count().max(sheet.cell_count(header_row));
    let mut out = Sheet::new(name);

    for r in std::iter::once(header_row).chain(header_row + 1..=sheet.row_count()) {
        let cells = (1..=width).map(|c| sheet.get(r, c).to_plain()).collect();
        out.push_row(cells);
    }
    out
}

/// Name for a prepared physical workbook, e.g. `ESTOQUE FISICO 2026-03-01 09-30.xlsx`.
pub fn prepared_physical_file(now: chrono::NaiveDateTime) -> String {
    format!("ESTOQUE FISICO {}.xlsx", now.format("%Y-%m-%d %H-%M"))
}
