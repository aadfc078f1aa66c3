// Excel file import/export
//
// Reading goes through calamine (xlsx, xlsm, xls, xlsb, ods). Cached formula
// results come from the value range and formula text from the formula range;
// both are merged into `CellValue::Formula`. Writing goes through
// rust_xlsxwriter and keeps formulas with their cached result.

use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet};
use stockrecon_recon::{CellValue, Sheet, Workbook};

/// Maximum number of cells to import (prevents DoS from huge files)
const MAX_CELLS: usize = 5_000_000;

/// Excel sheet limits
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Number format applied to date cells on export.
pub const DATE_FORMAT: &str = "dd/mm/yyyy";

#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub sheets_imported: usize,
    pub cells_imported: usize,
    pub formulas_imported: usize,
    pub dates_imported: usize,
    pub truncated: bool,
    pub warnings: Vec<String>,
    pub import_duration_ms: u128,
}

impl ImportResult {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} sheet(s), {} cell(s), {} formula(s)",
            self.sheets_imported, self.cells_imported, self.formulas_imported
        );
        if self.dates_imported > 0 {
            summary.push_str(&format!(", {} date(s)", self.dates_imported));
        }
        if self.truncated {
            summary.push_str(" (truncated)");
        }
        summary.push_str(&format!(" in {}ms", self.import_duration_ms));
        summary
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    pub formulas_exported: usize,
}

/// Import an Excel file (xlsx, xls, xlsb, ods)
pub fn import(path: &Path) -> Result<(Workbook, ImportResult), String> {
    let start_time = Instant::now();

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut result = ImportResult::default();
    let mut total_cells = 0;
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let mut sheet = Sheet::new(sheet_name.as_str());
        let (height, width) = range.get_size();

        if height > MAX_ROWS || width > MAX_COLS {
            result.truncated = true;
            result.warnings.push(format!(
                "Sheet '{}' truncated from {}x{} to at most {}x{}",
                sheet_name, height, width, MAX_ROWS, MAX_COLS
            ));
        }

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        'rows: for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row as usize + row_idx + 1;
            if target_row > MAX_ROWS {
                break;
            }
            for (col_idx, cell) in row.iter().enumerate() {
                let target_col = start_col as usize + col_idx + 1;
                if target_col > MAX_COLS {
                    break;
                }
                if total_cells >= MAX_CELLS {
                    result.truncated = true;
                    result.warnings.push(format!("Import stopped at {} cells (limit reached)", MAX_CELLS));
                    break 'rows;
                }

                let value = convert_cell(cell);
                if value.is_empty() {
                    continue;
                }
                if matches!(value, CellValue::Date(_)) {
                    result.dates_imported += 1;
                }
                sheet.set(target_row, target_col, value);
                result.cells_imported += 1;
                total_cells += 1;
            }
        }

        if let Ok(formula_range) = workbook.worksheet_formula(sheet_name) {
            let (f_start_row, f_start_col) = formula_range.start().unwrap_or((0, 0));
            for (row_idx, row) in formula_range.rows().enumerate() {
                let target_row = f_start_row as usize + row_idx + 1;
                if target_row > MAX_ROWS {
                    break;
                }
                for (col_idx, formula) in row.iter().enumerate() {
                    let target_col = f_start_col as usize + col_idx + 1;
                    if target_col > MAX_COLS || formula.is_empty() {
                        continue;
                    }
                    let source = formula.strip_prefix('=').unwrap_or(formula);
                    let cached = sheet.get(target_row, target_col).clone();
                    sheet.set(target_row, target_col, CellValue::formula(source, cached));
                    result.formulas_imported += 1;
                }
            }
        }

        sheets.push(sheet);
        result.sheets_imported += 1;
    }

    result.import_duration_ms = start_time.elapsed().as_millis();
    Ok((Workbook::new(sheets), result))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::text(format!("#{:?}", e)),
        // 1900 date system assumed; calamine does not expose the 1904 flag
        Data::DateTime(dt) => CellValue::Date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

/// Serialize a workbook to XLSX bytes.
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>, String> {
    let (mut xlsx, _) = build_workbook(workbook)?;
    xlsx.save_to_buffer()
        .map_err(|e| format!("Failed to write XLSX: {}", e))
}

/// Write a workbook to an XLSX file.
pub fn export(workbook: &Workbook, path: &Path) -> Result<ExportResult, String> {
    let (mut xlsx, result) = build_workbook(workbook)?;
    xlsx.save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(result)
}

fn build_workbook(workbook: &Workbook) -> Result<(XlsxWorkbook, ExportResult), String> {
    let mut xlsx = XlsxWorkbook::new();
    let mut result = ExportResult::default();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for sheet in workbook.sheets() {
        let worksheet = xlsx
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;

        let (cells, formulas) = export_sheet_cells(sheet, worksheet, &date_format)?;
        result.cells_exported += cells;
        result.formulas_exported += formulas;
        result.sheets_exported += 1;
    }

    Ok((xlsx, result))
}

fn export_sheet_cells(
    sheet: &Sheet,
    worksheet: &mut Worksheet,
    date_format: &Format,
) -> Result<(usize, usize), String> {
    let mut cells_exported = 0;
    let mut formulas_exported = 0;

    for (r, cells) in sheet.rows().enumerate() {
        let row32 = u32::try_from(r).map_err(|_| format!("Row {} out of range", r + 1))?;
        for (c, cell) in cells.iter().enumerate() {
            let col16 = u16::try_from(c).map_err(|_| format!("Column {} out of range", c + 1))?;
            let err = |e: rust_xlsxwriter::XlsxError| {
                format!("Failed to write cell ({}, {}): {}", r + 1, c + 1, e)
            };

            match cell {
                CellValue::Empty => continue,
                CellValue::Text(s) => {
                    worksheet.write_string(row32, col16, s).map_err(err)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row32, col16, *n).map_err(err)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row32, col16, *b).map_err(err)?;
                }
                CellValue::Date(serial) => {
                    worksheet
                        .write_number_with_format(row32, col16, *serial, date_format)
                        .map_err(err)?;
                }
                CellValue::Formula { formula, cached } => {
                    let mut f = Formula::new(formula.as_str());
                    if !cached.is_empty() {
                        f = f.set_result(cached.as_text());
                    }
                    worksheet.write_formula(row32, col16, f).map_err(err)?;
                    formulas_exported += 1;
                }
            }
            cells_exported += 1;
        }
    }

    Ok((cells_exported, formulas_exported))
}
