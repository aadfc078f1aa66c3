//! `stockrecon-recon`: physical vs SAP inventory reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded workbooks, annotates them in place
//! and returns the per-row results. No CLI or IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod grid;
pub mod header;
pub mod model;
pub mod normalize;
pub mod prepare;

pub use classify::DepositCode;
pub use config::{Rules, RulesConfig};
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use grid::{CellValue, Sheet, Workbook};
pub use model::{Analysis, AnalysisRequest, ExportSelection, LotStatus, ReconSummary, Source};
