use std::fmt;

use serde::Serialize;

use crate::classify::DepositCode;
use crate::grid::{Sheet, Workbook};

// ---------------------------------------------------------------------------
// Sources + fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Physical,
    Sap,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical => write!(f, "physical"),
            Self::Sap => write!(f, "SAP"),
        }
    }
}

/// Logical columns of the physical count sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhysicalField {
    Code,
    Description,
    Quantity,
    Unit,
    /// Free-text lot disposition ("DS FSA"), input of the deposit classifier.
    Disposition,
    Manufactured,
    Expiry,
    Lot,
    Observations,
    SapDeposit,
}

impl PhysicalField {
    pub const ALL: [PhysicalField; 10] = [
        Self::Code,
        Self::Description,
        Self::Quantity,
        Self::Unit,
        Self::Disposition,
        Self::Manufactured,
        Self::Expiry,
        Self::Lot,
        Self::Observations,
        Self::SapDeposit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Description => "description",
            Self::Quantity => "quantity",
            Self::Unit => "unit",
            Self::Disposition => "disposition",
            Self::Manufactured => "manufactured",
            Self::Expiry => "expiry",
            Self::Lot => "lot",
            Self::Observations => "observations",
            Self::SapDeposit => "sap_deposit",
        }
    }
}

/// Logical columns of the SAP stock sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SapField {
    /// "Nº do item", the item code joined against the physical code.
    ItemNumber,
    Item,
    Deposit,
    Lot,
    Quantity,
    Details,
}

impl SapField {
    pub const ALL: [SapField; 6] = [
        Self::ItemNumber,
        Self::Item,
        Self::Deposit,
        Self::Lot,
        Self::Quantity,
        Self::Details,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ItemNumber => "item_number",
            Self::Item => "item",
            Self::Deposit => "deposit",
            Self::Lot => "lot",
            Self::Quantity => "quantity",
            Self::Details => "details",
        }
    }
}

// ---------------------------------------------------------------------------
// Record key
// ---------------------------------------------------------------------------

/// Reconciliation unit: (item code, lot), both trimmed, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub code: String,
    pub lot: String,
}

impl RecordKey {
    /// `None` when either part is blank; such rows are not comparable.
    pub fn new(code: &str, lot: &str) -> Option<Self> {
        let code = code.trim();
        let lot = lot.trim();
        if code.is_empty() || lot.is_empty() {
            return None;
        }
        Some(Self { code: code.to_string(), lot: lot.to_string() })
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.code, self.lot)
    }
}

// ---------------------------------------------------------------------------
// Per-row results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum LotStatus {
    /// Rounded totals agree.
    Matched,
    /// Rounded totals differ; `diff` = physical - SAP.
    Discrepancy { diff: i64, total_sap: i64, total_physical: i64 },
    /// No SAP entry for the key.
    NotInSap,
}

/// What the engine wrote on one physical row.
#[derive(Debug, Clone, Serialize)]
pub struct RowAnnotation {
    pub row: usize,
    pub key: RecordKey,
    pub current: Option<DepositCode>,
    pub target: DepositCode,
    pub deposit_cell: String,
    pub observation: String,
    pub status: LotStatus,
}

impl RowAnnotation {
    pub fn needs_transfer(&self) -> bool {
        matches!(self.current, Some(current) if current != self.target)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub physical_rows: usize,
    pub matched: usize,
    pub discrepancies: usize,
    pub not_in_sap: usize,
    pub transfers: usize,
    pub sap_rows: usize,
    pub sap_rows_excluded: usize,
    pub sap_rows_found: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub physical_sheet: String,
    pub sap_sheet: String,
    pub physical_header_row: usize,
    pub sap_header_row: usize,
    pub engine_version: String,
    pub run_at: String,
}

/// Which files a run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSelection {
    /// Annotated physical workbook only.
    Fisico,
    /// Plain SAP sheet only.
    Sap,
    /// Both, packaged together.
    #[default]
    Zip,
}

impl ExportSelection {
    pub fn includes_physical(self) -> bool {
        matches!(self, Self::Fisico | Self::Zip)
    }

    pub fn includes_sap(self) -> bool {
        matches!(self, Self::Sap | Self::Zip)
    }
}

impl std::str::FromStr for ExportSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fisico" | "físico" | "physical" => Ok(Self::Fisico),
            "sap" => Ok(Self::Sap),
            "zip" | "both" => Ok(Self::Zip),
            other => Err(format!("unknown export selection '{other}' (expected fisico, sap or zip)")),
        }
    }
}

/// Inputs of one analysis run. The workbooks are consumed: the run mutates them.
#[derive(Debug, Default)]
pub struct AnalysisRequest {
    pub physical: Option<Workbook>,
    pub sap: Option<Workbook>,
    /// Physical tab name; the first sheet is used when absent.
    pub physical_sheet: Option<String>,
    pub sap_sheet: String,
    pub export: ExportSelection,
}

impl AnalysisRequest {
    pub fn new(physical: Workbook, sap: Workbook) -> Self {
        Self {
            physical: Some(physical),
            sap: Some(sap),
            physical_sheet: None,
            sap_sheet: DEFAULT_SAP_SHEET.to_string(),
            export: ExportSelection::default(),
        }
    }
}

pub const DEFAULT_SAP_SHEET: &str = "Planilha1";

/// Result of a run: the outputs selected by the request plus the report.
#[derive(Debug)]
pub struct Analysis {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub annotations: Vec<RowAnnotation>,
    /// Full physical workbook with the annotated sheet.
    pub physical: Option<Workbook>,
    /// Plain (formula- and style-free) SAP sheet.
    pub sap_plain: Option<Sheet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub meta: &'a ReconMeta,
    pub summary: &'a ReconSummary,
    pub rows: &'a [RowAnnotation],
}

impl Analysis {
    pub fn report(&self) -> AnalysisReport<'_> {
        AnalysisReport { meta: &self.meta, summary: &self.summary, rows: &self.annotations }
    }
}
