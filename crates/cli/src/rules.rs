//! `stockrecon rules`: inspect and validate reconciliation rules files.

use std::path::PathBuf;

use clap::Subcommand;

use crate::{load_rules, read_rules_config, CliError};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Check that a rules file parses, validates and compiles
    #[command(after_help = "\
Examples:
  stockrecon rules validate planta-b.toml")]
    Validate {
        file: PathBuf,
    },

    /// Print rules as TOML (the built-in rules when no file is given)
    #[command(after_help = "\
Examples:
  stockrecon rules show > rules.toml
  stockrecon rules show planta-b.toml")]
    Show {
        file: Option<PathBuf>,
    },
}

pub fn cmd_rules(cmd: RulesCommands) -> Result<(), CliError> {
    match cmd {
        RulesCommands::Validate { file } => {
            let rules = load_rules(Some(file.as_path()))?;
            eprintln!(
                "valid: {} physical / {} SAP synonym group(s), {} excluded deposit(s), {} classifier rule(s)",
                rules.physical.groups().len(),
                rules.sap.groups().len(),
                rules.exclude_deposits.len(),
                rules.classifier.len(),
            );
            Ok(())
        }
        RulesCommands::Show { file } => {
            let config = read_rules_config(file.as_deref())?;
            let toml = config.to_toml().map_err(CliError::recon)?;
            print!("{toml}");
            Ok(())
        }
    }
}
