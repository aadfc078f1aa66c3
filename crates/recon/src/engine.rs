use std::collections::{BTreeMap, HashSet};

use crate::aggregate::{aggregate_physical, aggregate_sap, exclude_deposits, lot_key, PhysicalAggregate, SapEntry};
use crate::classify::{compose_deposit_cell, normalize_deposit_label, DepositClassifier};
use crate::compose::{plain_sheet, PLAIN_SAP_SHEET};
use crate::config::Rules;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::grid::Sheet;
use crate::header::HeaderMap;
use crate::model::{
    Analysis, AnalysisRequest, LotStatus, PhysicalField, ReconMeta, ReconSummary, RecordKey,
    RowAnnotation, SapField, Source,
};
use crate::normalize::normalize_cell;

/// Header written when the physical sheet has no SAP deposit column.
pub const SAP_DEPOSIT_LABEL: &str = "depósito SAP";
/// Header written when the physical sheet has no observations column.
pub const OBSERVATIONS_LABEL: &str = "OBSERVAÇÕES";
/// Header of the SAP details column (also replaces a bare "detalhes").
pub const DETAILS_LABEL: &str = "detalhes analise";

pub const LOT_NOT_FOUND: &str = "Lote não Localizado no SAP";
pub const OK: &str = "OK";

const PHYSICAL_REQUIRED: [PhysicalField; 3] =
    [PhysicalField::Code, PhysicalField::Lot, PhysicalField::Quantity];
const SAP_REQUIRED: [SapField; 3] = [SapField::ItemNumber, SapField::Lot, SapField::Quantity];

/// Outcome of reconciling one physical sheet against one SAP sheet.
#[derive(Debug)]
pub struct Reconciliation {
    pub physical_columns: HeaderMap<PhysicalField>,
    pub sap_columns: HeaderMap<SapField>,
    pub annotations: Vec<RowAnnotation>,
    pub summary: ReconSummary,
}

/// Run a full analysis: look up both sheets, reconcile them in place and
/// build the outputs selected by `request.export`.
pub fn run(request: AnalysisRequest, rules: &Rules) -> Result<Analysis, ReconError> {
    let AnalysisRequest { physical, sap, physical_sheet, sap_sheet, export } = request;

    let mut physical_wb = physical.ok_or(ReconError::MissingInput(Source::Physical))?;
    let mut sap_wb = sap.ok_or(ReconError::MissingInput(Source::Sap))?;

    let physical_name = match physical_sheet.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => physical_wb
            .first_sheet_name()
            .map(str::to_string)
            .ok_or_else(|| ReconError::SheetNotFound {
                source: Source::Physical,
                sheet: String::new(),
            })?,
    };

    let physical_ws =
        physical_wb.sheet_mut(&physical_name).ok_or_else(|| ReconError::SheetNotFound {
            source: Source::Physical,
            sheet: physical_name.clone(),
        })?;
    let sap_ws = sap_wb.sheet_mut(&sap_sheet).ok_or_else(|| ReconError::SheetNotFound {
        source: Source::Sap,
        sheet: sap_sheet.clone(),
    })?;

    let recon = reconcile(physical_ws, sap_ws, rules)?;

    let sap_plain = export
        .includes_sap()
        .then(|| plain_sheet(sap_ws, recon.sap_columns.header_row, PLAIN_SAP_SHEET));

    let meta = ReconMeta {
        physical_sheet: physical_name,
        sap_sheet,
        physical_header_row: recon.physical_columns.header_row,
        sap_header_row: recon.sap_columns.header_row,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    };

    Ok(Analysis {
        meta,
        summary: recon.summary,
        annotations: recon.annotations,
        physical: export.includes_physical().then_some(physical_wb),
        sap_plain,
    })
}

/// Reconcile two sheets in place.
///
/// Both header maps are resolved and checked before either sheet is touched,
/// so a missing required column leaves the inputs unchanged.
pub fn reconcile(physical: &mut Sheet, sap: &mut Sheet, rules: &Rules) -> Result<Reconciliation, ReconError> {
    let mut physical_columns = HeaderMap::detect(physical, &rules.physical, rules.physical_min_score);
    let mut sap_columns = HeaderMap::detect(sap, &rules.sap, rules.sap_min_score);

    for field in PHYSICAL_REQUIRED {
        physical_columns.require(field, Source::Physical)?;
    }
    for field in SAP_REQUIRED {
        sap_columns.require(field, Source::Sap)?;
    }
    log::debug!(
        "header rows: physical '{}' row {}, SAP '{}' row {}",
        physical.name,
        physical_columns.header_row,
        sap.name,
        sap_columns.header_row
    );

    physical_columns.ensure_column(physical, PhysicalField::SapDeposit, SAP_DEPOSIT_LABEL);
    physical_columns.ensure_column(physical, PhysicalField::Observations, OBSERVATIONS_LABEL);
    ensure_details_column(sap, &mut sap_columns);

    let excluded = match sap_columns.get(SapField::Deposit) {
        Some(col) => exclude_deposits(sap, sap_columns.header_row, col, &rules.exclude_deposits),
        None => {
            log::warn!("SAP sheet '{}' has no deposit column; exclusion filter skipped", sap.name);
            0
        }
    };
    if excluded > 0 {
        log::info!("removed {excluded} SAP row(s) in excluded deposits");
    }

    let sap_entries = aggregate_sap(sap, &sap_columns);
    let physical_agg = aggregate_physical(physical, &physical_columns);

    let annotations = annotate_physical(
        physical,
        &physical_columns,
        &physical_agg,
        &sap_entries,
        &rules.classifier,
    );
    let sap_found = mark_sap_rows(sap, &sap_columns, &physical_agg.lots);
    let sap_rows = sap.row_count().saturating_sub(sap_columns.header_row);

    let summary = compute_summary(&annotations, sap_rows, excluded, sap_found);
    log::info!(
        "reconciled {} physical row(s): {} ok, {} with differences, {} not in SAP, {} transfer(s)",
        summary.physical_rows,
        summary.matched,
        summary.discrepancies,
        summary.not_in_sap,
        summary.transfers
    );

    Ok(Reconciliation { physical_columns, sap_columns, annotations, summary })
}

/// Make sure the SAP sheet has a details column labelled [`DETAILS_LABEL`].
pub(crate) fn ensure_details_column(sap: &mut Sheet, columns: &mut HeaderMap<SapField>) -> usize {
    match columns.get(SapField::Details) {
        Some(col) => {
            if normalize_cell(sap.get(columns.header_row, col)) == "detalhes" {
                sap.set(columns.header_row, col, DETAILS_LABEL);
            }
            col
        }
        None => columns.ensure_column(sap, SapField::Details, DETAILS_LABEL),
    }
}

/// Write the deposit and observation cells of every keyed physical row.
fn annotate_physical(
    sheet: &mut Sheet,
    columns: &HeaderMap<PhysicalField>,
    physical: &PhysicalAggregate,
    sap: &BTreeMap<RecordKey, SapEntry>,
    classifier: &DepositClassifier,
) -> Vec<RowAnnotation> {
    let code_col = columns.get(PhysicalField::Code);
    let lot_col = columns.get(PhysicalField::Lot);
    let disposition_col = columns.get(PhysicalField::Disposition);
    let (Some(deposit_col), Some(obs_col)) =
        (columns.get(PhysicalField::SapDeposit), columns.get(PhysicalField::Observations))
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for r in columns.first_data_row()..=sheet.row_count() {
        let Some(key) = RecordKey::new(&sheet.text_at(r, code_col), &sheet.text_at(r, lot_col)) else {
            continue;
        };

        let disposition = disposition_col
            .map(|c| sheet.get(r, c).as_text())
            .unwrap_or_default();
        let target = classifier.classify(&disposition);

        let (current, deposit_cell, status) = match sap.get(&key) {
            None => (None, target.short_label().to_string(), LotStatus::NotInSap),
            Some(entry) => {
                let current = entry.dominant_deposit().and_then(normalize_deposit_label);
                let total_physical = physical.totals.get(&key).copied().unwrap_or(0.0);
                (
                    current,
                    compose_deposit_cell(current, target),
                    compare_totals(total_physical, entry.total),
                )
            }
        };
        let observation = observation_text(&status);

        sheet.set(r, deposit_col, deposit_cell.as_str());
        sheet.set(r, obs_col, observation.as_str());

        out.push(RowAnnotation { row: r, key, current, target, deposit_cell, observation, status });
    }
    out
}

/// Mark each SAP data row "OK" when its lot was counted on the physical side
/// (under any item code). Returns the number of rows marked.
fn mark_sap_rows(sheet: &mut Sheet, columns: &HeaderMap<SapField>, physical_lots: &HashSet<String>) -> usize {
    let lot_col = columns.get(SapField::Lot);
    let Some(details_col) = columns.get(SapField::Details) else {
        return 0;
    };

    let mut found = 0;
    for r in columns.first_data_row()..=sheet.row_count() {
        let lot = lot_key(&sheet.text_at(r, lot_col));
        let mark = if !lot.is_empty() && physical_lots.contains(&lot) {
            found += 1;
            OK
        } else {
            ""
        };
        sheet.set(r, details_col, mark);
    }
    found
}

/// Compare totals after rounding each to the nearest unit (halves round up).
pub fn compare_totals(total_physical: f64, total_sap: f64) -> LotStatus {
    let total_physical = round_half_up(total_physical);
    let total_sap = round_half_up(total_sap);
    let diff = total_physical - total_sap;
    if diff == 0 {
        LotStatus::Matched
    } else {
        LotStatus::Discrepancy { diff, total_sap, total_physical }
    }
}

/// Text of the physical observations cell.
pub fn observation_text(status: &LotStatus) -> String {
    match status {
        LotStatus::Matched => OK.to_string(),
        LotStatus::NotInSap => LOT_NOT_FOUND.to_string(),
        LotStatus::Discrepancy { diff, total_sap, total_physical } => format!(
            "DIFERENÇA DE {} KG - ESTOQUE SAP {} E ESTOQUE FÍSICO {}",
            diff.abs(),
            total_sap,
            total_physical
        ),
    }
}

fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}
