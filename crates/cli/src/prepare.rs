//! `stockrecon prepare-fisico` and `stockrecon consolidate-sap`.

use std::path::Path;

use stockrecon_io::xlsx;
use stockrecon_recon::compose::{prepared_physical_file, SAP_CONSOLIDATED_FILE};
use stockrecon_recon::prepare::{consolidate_sap, prepare_physical};
use stockrecon_recon::{ReconError, Source, Workbook};

use crate::{load_rules, read_input, write_output, CliError};

pub fn cmd_prepare_fisico(file: &Path, sheet: Option<String>, out_dir: &Path) -> Result<(), CliError> {
    let mut workbook = read_input(file)?;
    let name = match sheet {
        Some(name) => name,
        None => first_sheet(&workbook, Source::Physical)?,
    };
    let target = workbook.sheet_mut(&name).ok_or_else(|| {
        CliError::recon(ReconError::SheetNotFound { source: Source::Physical, sheet: name.clone() })
    })?;

    let added = prepare_physical(target);

    let bytes = xlsx::write_workbook(&workbook).map_err(CliError::io)?;
    let file_name = prepared_physical_file(chrono::Local::now().naive_local());
    let path = write_output(out_dir, &file_name, &bytes)?;

    if added {
        eprintln!("prepared '{name}': added 'depósito SAP' column");
    } else {
        eprintln!("prepared '{name}': 'depósito SAP' column already present");
    }
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_consolidate_sap(
    file: &Path,
    sheet: &str,
    out_dir: &Path,
    rules: Option<&Path>,
) -> Result<(), CliError> {
    let rules = load_rules(rules)?;
    let mut workbook = read_input(file)?;

    let name = if workbook.sheet(sheet).is_some() {
        sheet.to_string()
    } else {
        let first = first_sheet(&workbook, Source::Sap)?;
        log::warn!("sheet '{sheet}' not found in {}; using '{first}'", file.display());
        first
    };
    let target = workbook.sheet_mut(&name).ok_or_else(|| {
        CliError::recon(ReconError::SheetNotFound { source: Source::Sap, sheet: name.clone() })
    })?;

    let outcome = consolidate_sap(target, &rules);

    let bytes = xlsx::write_workbook(&workbook).map_err(CliError::io)?;
    let path = write_output(out_dir, SAP_CONSOLIDATED_FILE, &bytes)?;

    eprintln!(
        "consolidated '{name}': header on row {}, {} row(s) removed by deposit",
        outcome.header_row, outcome.removed,
    );
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn first_sheet(workbook: &Workbook, source: Source) -> Result<String, CliError> {
    workbook
        .first_sheet_name()
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::recon(ReconError::SheetNotFound { source, sheet: String::new() })
                .with_hint("the workbook has no sheets")
        })
}
