//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments; also clap parse errors)  |
//! | 3    | Missing input workbook or sheet not found            |
//! | 4    | Required column not found in a header row            |
//! | 5    | Invalid rules file                                   |
//! | 6    | File read/write failure                              |

use stockrecon_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A source workbook was not given, or the requested sheet does not exist.
pub const EXIT_MISSING_INPUT: u8 = 3;

/// A column the reconciliation key or totals depend on was not found.
pub const EXIT_MISSING_COLUMN: u8 = 4;

/// Rules TOML failed to parse or validate.
pub const EXIT_INVALID_RULES: u8 = 5;

/// Cannot read an input file or write an output file.
pub const EXIT_IO: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::MissingInput(_) | ReconError::SheetNotFound { .. } => EXIT_MISSING_INPUT,
        ReconError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        ReconError::RulesParse(_) | ReconError::RulesValidation(_) => EXIT_INVALID_RULES,
    }
}
