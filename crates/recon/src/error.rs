use std::fmt;

use crate::model::Source;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// One of the two source workbooks was not supplied.
    MissingInput(Source),
    /// The requested sheet (tab) does not exist in the workbook.
    SheetNotFound { source: Source, sheet: String },
    /// A column the record key or totals depend on could not be resolved.
    MissingColumn { source: Source, field: String },
    /// TOML parse / deserialization error in a rules file.
    RulesParse(String),
    /// Rules validation error (empty synonyms, bad regex, zero threshold, ...).
    RulesValidation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(source) => {
                write!(f, "missing input: the {source} workbook was not provided")
            }
            Self::SheetNotFound { source, sheet } => {
                write!(f, "{source} sheet '{sheet}' not found")
            }
            Self::MissingColumn { source, field } => {
                write!(f, "{source} sheet: required column '{field}' not found in header row")
            }
            Self::RulesParse(msg) => write!(f, "rules parse error: {msg}"),
            Self::RulesValidation(msg) => write!(f, "rules validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
