//! `stockrecon analyze` and `stockrecon sheets`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use stockrecon_io::{package, xlsx};
use stockrecon_recon::compose::{PHYSICAL_OUTPUT_FILE, SAP_OUTPUT_FILE, ZIP_OUTPUT_FILE};
use stockrecon_recon::model::{Analysis, AnalysisReport};
use stockrecon_recon::{AnalysisRequest, ExportSelection, Workbook};

use crate::{load_rules, read_input, write_output, CliError};

pub struct AnalyzeArgs {
    pub fisico: Option<PathBuf>,
    pub sap: Option<PathBuf>,
    pub fisico_sheet: Option<String>,
    pub sap_sheet: String,
    pub export: ExportSelection,
    pub out_dir: PathBuf,
    pub rules: Option<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    #[serde(flatten)]
    report: AnalysisReport<'a>,
    outputs: Vec<String>,
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    if args.out_dir.exists() && !args.out_dir.is_dir() {
        return Err(CliError::args(format!("--out-dir {} is not a directory", args.out_dir.display())));
    }
    let rules = load_rules(args.rules.as_deref())?;

    let physical = args.fisico.as_deref().map(read_input).transpose()?;
    let sap = args.sap.as_deref().map(read_input).transpose()?;

    let request = AnalysisRequest {
        physical,
        sap,
        physical_sheet: args.fisico_sheet,
        sap_sheet: args.sap_sheet,
        export: args.export,
    };
    let analysis = stockrecon_recon::run(request, &rules).map_err(CliError::recon)?;

    // Every output is rendered before anything touches the disk.
    let files = render_outputs(&analysis, args.export)?;
    let mut written = Vec::with_capacity(files.len());
    for (name, bytes) in &files {
        let path = write_output(&args.out_dir, name, bytes)?;
        written.push(path.display().to_string());
    }

    if args.json {
        let output = AnalyzeOutput { report: analysis.report(), outputs: written.clone() };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    let s = &analysis.summary;
    eprintln!(
        "analysis: {} physical row(s): {} ok, {} with differences, {} not in SAP; {} transfer(s)",
        s.physical_rows, s.matched, s.discrepancies, s.not_in_sap, s.transfers,
    );
    eprintln!(
        "SAP: {} row(s), {} excluded by deposit, {} found in the physical count",
        s.sap_rows, s.sap_rows_excluded, s.sap_rows_found,
    );
    for path in &written {
        eprintln!("wrote {path}");
    }

    Ok(())
}

/// Serialize the outputs selected by `export` as `(file name, bytes)` pairs.
fn render_outputs(analysis: &Analysis, export: ExportSelection) -> Result<Vec<(String, Vec<u8>)>, CliError> {
    let physical = match &analysis.physical {
        Some(wb) => Some(xlsx::write_workbook(wb).map_err(CliError::io)?),
        None => None,
    };
    let sap = match &analysis.sap_plain {
        Some(sheet) => {
            let wb = Workbook::new(vec![sheet.clone()]);
            Some(xlsx::write_workbook(&wb).map_err(CliError::io)?)
        }
        None => None,
    };

    let files = match (export, physical, sap) {
        (ExportSelection::Zip, Some(physical), Some(sap)) => {
            let archive = package::zip_files(&[
                (PHYSICAL_OUTPUT_FILE, physical.as_slice()),
                (SAP_OUTPUT_FILE, sap.as_slice()),
            ])
            .map_err(CliError::io)?;
            vec![(ZIP_OUTPUT_FILE.to_string(), archive)]
        }
        (_, physical, sap) => {
            let mut files = Vec::new();
            if let Some(bytes) = physical {
                files.push((PHYSICAL_OUTPUT_FILE.to_string(), bytes));
            }
            if let Some(bytes) = sap {
                files.push((SAP_OUTPUT_FILE.to_string(), bytes));
            }
            files
        }
    };
    Ok(files)
}

pub fn cmd_sheets(file: &Path, json: bool) -> Result<(), CliError> {
    let workbook = read_input(file)?;
    let names = workbook.sheet_names();

    if json {
        let out = serde_json::to_string(&names)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(())
}
