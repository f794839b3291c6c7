//! Scan-terminating error types
//!
//! Everything here aborts the scan as a single terminal failure; the caller
//! decides retry policy (typically the next scheduled cycle). Row-level
//! failures never reach this module.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::snapshot::SnapshotError;
use crate::source::SourceError;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Consumer-side delivery failure.
#[derive(Debug, Error)]
#[error("Consumer rejected delivery: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Terminal scan failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Persisted snapshot could not be read or written
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Checkpoint marker could not be read or written
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The row source failed to produce a batch
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The consumer rejected a delivery
    #[error("Delivery of '{doc_id}' failed: {source}")]
    Sink {
        doc_id: String,
        #[source]
        source: SinkError,
    },

    /// A second scan was started while one was running
    #[error("A scan is already in progress for this source")]
    ScanInProgress,

    /// The resumed scan never reached the acknowledged document, so the
    /// source must have changed since the interruption
    #[error("Source changed since the interrupted scan; run a full scan")]
    StaleResume,
}
