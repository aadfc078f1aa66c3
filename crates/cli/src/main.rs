// stockrecon CLI - physical vs SAP stock reconciliation

mod analyze;
mod exit_codes;
mod prepare;
mod rules;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use stockrecon_recon::model::DEFAULT_SAP_SHEET;
use stockrecon_recon::{ExportSelection, ReconError, Rules, RulesConfig};

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_INVALID_RULES, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stockrecon")]
#[command(about = "Reconcile a physical stock count against a SAP stock export")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a physical count workbook against a SAP stock workbook
    #[command(after_help = "\
Examples:
  stockrecon analyze --fisico contagem.xlsx --sap estoque-sap.xlsx
  stockrecon analyze --fisico contagem.xlsx --sap sap.xlsx --export fisico --out-dir out/
  stockrecon analyze --fisico contagem.csv --sap sap.xlsx --sap-sheet Estoque --json
  stockrecon analyze --fisico contagem.xlsx --sap sap.xlsx --rules planta-b.toml")]
    Analyze {
        /// Physical count workbook (xlsx, xls, ods, csv)
        #[arg(long, value_name = "FILE")]
        fisico: Option<PathBuf>,

        /// SAP stock workbook (xlsx, xls, ods, csv)
        #[arg(long, value_name = "FILE")]
        sap: Option<PathBuf>,

        /// Physical sheet name (defaults to the first sheet)
        #[arg(long, value_name = "NAME")]
        fisico_sheet: Option<String>,

        /// SAP sheet name
        #[arg(long, value_name = "NAME", default_value = DEFAULT_SAP_SHEET)]
        sap_sheet: String,

        /// Which outputs to write: fisico, sap or zip (both, packaged)
        #[arg(long, default_value = "zip")]
        export: ExportSelection,

        /// Directory for output files
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Rules TOML overriding the built-in synonyms, exclusions and classifier
        #[arg(long, value_name = "FILE", env = "STOCKRECON_RULES")]
        rules: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List the sheets of a workbook
    #[command(after_help = "\
Examples:
  stockrecon sheets estoque-sap.xlsx
  stockrecon sheets contagem.xlsx --json")]
    Sheets {
        file: PathBuf,

        /// Output JSON array instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Add the "depósito SAP" column to a physical count sheet
    #[command(name = "prepare-fisico")]
    PrepareFisico {
        file: PathBuf,

        /// Sheet name (defaults to the first sheet)
        #[arg(long, value_name = "NAME")]
        sheet: Option<String>,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Drop excluded deposits from a SAP sheet and reset its details column
    #[command(name = "consolidate-sap")]
    ConsolidateSap {
        file: PathBuf,

        /// Sheet name (falls back to the first sheet when missing)
        #[arg(long, value_name = "NAME", default_value = DEFAULT_SAP_SHEET)]
        sheet: String,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        #[arg(long, value_name = "FILE", env = "STOCKRECON_RULES")]
        rules: Option<PathBuf>,
    },

    /// Inspect or validate reconciliation rules
    #[command(subcommand)]
    Rules(rules::RulesCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  stockrecon-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout is reserved for --json output
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze { fisico, sap, fisico_sheet, sap_sheet, export, out_dir, rules, json } => {
            analyze::cmd_analyze(analyze::AnalyzeArgs {
                fisico,
                sap,
                fisico_sheet,
                sap_sheet,
                export,
                out_dir,
                rules,
                json,
            })
        }
        Commands::Sheets { file, json } => analyze::cmd_sheets(&file, json),
        Commands::PrepareFisico { file, sheet, out_dir } => {
            prepare::cmd_prepare_fisico(&file, sheet, &out_dir)
        }
        Commands::ConsolidateSap { file, sheet, out_dir, rules } => {
            prepare::cmd_consolidate_sap(&file, &sheet, &out_dir, rules.as_deref())
        }
        Commands::Rules(cmd) => rules::cmd_rules(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with the matching exit code.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingInput(source) => Some(format!(
                "pass the {source} workbook with --{}",
                match source {
                    stockrecon_recon::Source::Physical => "fisico",
                    stockrecon_recon::Source::Sap => "sap",
                }
            )),
            ReconError::SheetNotFound { .. } => {
                Some("run `stockrecon sheets FILE` to list the available sheets".to_string())
            }
            ReconError::MissingColumn { .. } => Some(
                "add the header spelling to the rules file (`stockrecon rules show` prints the defaults)"
                    .to_string(),
            ),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Parse and validate a rules file, or return the built-in rules when no
/// path is given.
pub fn read_rules_config(path: Option<&Path>) -> Result<RulesConfig, CliError> {
    let Some(path) = path else {
        return Ok(RulesConfig::default());
    };
    let input = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read rules {}: {e}", path.display())))?;
    RulesConfig::from_toml(&input).map_err(|e| CliError {
        code: EXIT_INVALID_RULES,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

/// Load and compile rules (see [`read_rules_config`]).
pub fn load_rules(path: Option<&Path>) -> Result<Rules, CliError> {
    read_rules_config(path)?.compile().map_err(CliError::recon)
}

/// Write `bytes` to `dir/name`, creating the directory when needed.
pub fn write_output(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    Ok(path)
}

/// Read a workbook, mapping reader failures to the I/O exit code.
pub fn read_input(path: &Path) -> Result<stockrecon_recon::Workbook, CliError> {
    stockrecon_io::read_workbook(path).map_err(CliError::io)
}
