//! Materialization error types
//!
//! A materialization failure is scoped to one row: the row's document is
//! skipped and counted, the scan keeps going. Only the scan-level snapshot
//! and source errors are fatal.

use std::io;

use thiserror::Error;

/// Result type for materialization
pub type MaterializationResult<T> = Result<T, MaterializationError>;

#[derive(Debug, Error)]
pub enum MaterializationError {
    /// The content column is not part of the scanned query
    #[error("Content column '{0}' has no resolved strategy")]
    UnknownColumn(String),

    /// The value does not match the column's declared kind
    #[error("Column '{column}' expected {expected} value, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Reading the large-object stream failed
    #[error("Failed to read large object from column '{column}': {source}")]
    LobRead {
        column: String,
        #[source]
        source: io::Error,
    },

    /// Writing the spill file failed
    #[error("Failed to spill content to disk: {source}")]
    Spill {
        #[source]
        source: io::Error,
    },
}
