//! Single-file preparation steps run outside a full analysis.

use crate::aggregate::exclude_deposits;
use crate::config::Rules;
use crate::engine::{ensure_details_column, SAP_DEPOSIT_LABEL};
use crate::grid::Sheet;
use crate::header::HeaderMap;
use crate::model::SapField;

/// Add a "depósito SAP" column to row 1 of a physical sheet unless one is
/// already there. Returns `true` when a column was added.
pub fn prepare_physical(sheet: &mut Sheet) -> bool {
    let exists = sheet.row(1).iter().any(|cell| {
        let label = cell.as_text().trim().to_lowercase();
        label == "depósito sap" || label == "deposito sap"
    });
    if exists {
        return false;
    }
    let col = sheet.cell_count(1) + 1;
    sheet.set(1, col, SAP_DEPOSIT_LABEL);
    log::info!("added '{SAP_DEPOSIT_LABEL}' column at {col} of '{}'", sheet.name);
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consolidation {
    pub header_row: usize,
    pub details_col: usize,
    pub removed: usize,
}

/// Clean a SAP sheet on its own: ensure the details column, drop rows in
/// excluded deposits and blank the details of every remaining data row.
pub fn consolidate_sap(sheet: &mut Sheet, rules: &Rules) -> Consolidation {
    let mut columns = HeaderMap::detect(sheet, &rules.sap, rules.sap_min_score);

    let details_col = ensure_details_column(sheet, &mut columns);
    let removed = match columns.get(SapField::Deposit) {
        Some(col) => exclude_deposits(sheet, columns.header_row, col, &rules.exclude_deposits),
        None => {
            log::warn!("SAP sheet '{}' has no deposit column; exclusion filter skipped", sheet.name);
            0
        }
    };

    for r in columns.first_data_row()..=sheet.row_count() {
        if !sheet.get(r, details_col).is_empty() {
            sheet.set(r, details_col, "");
        }
    }

    log::info!(
        "consolidated '{}': header row {}, {removed} row(s) removed",
        sheet.name,
        columns.header_row
    );
    Consolidation { header_row: columns.header_row, details_col, removed }
}
