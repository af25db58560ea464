//! Error types raised by the analysis engine.
//!
//! Only malformed input and invalid configuration are errors. Degenerate data
//! (no rows, nothing repeating) always produces a result, and internal
//! conservation defects are healed and traced rather than surfaced here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A data row does not line up with the header row.
    #[error("Row {row} has {found} value(s) but {expected} header(s) were supplied")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("No columns supplied for analysis")]
    NoColumns,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AnalysisOutcome<T> = std::result::Result<T, AnalysisError>;
