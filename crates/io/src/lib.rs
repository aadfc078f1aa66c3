// File I/O operations

pub mod csv;
pub mod package;
pub mod xlsx;

use std::path::Path;

use stockrecon_recon::Workbook;

/// Extensions read through the delimited-text importer.
const TEXT_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Read any supported tabular file into a workbook.
///
/// Delimited text becomes a single sheet named after the file stem; every
/// other extension goes through the Excel/ODS reader.
pub fn read_workbook(path: &Path) -> Result<Workbook, String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let sheet = if ext == "tsv" { csv::import_tsv(path)? } else { csv::import(path)? };
        return Ok(Workbook::new(vec![sheet]));
    }

    let (workbook, result) = xlsx::import(path)?;
    log::debug!("{}: {}", path.display(), result.summary());
    for warning in &result.warnings {
        log::warn!("{}: {warning}", path.display());
    }
    Ok(workbook)
}
