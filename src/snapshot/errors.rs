//! Snapshot error types
//!
//! Error codes:
//! - FEED_SNAPSHOT_IO (ERROR severity)
//! - FEED_SNAPSHOT_CORRUPT (ERROR severity)
//! - FEED_SNAPSHOT_FORMAT (ERROR severity)
//!
//! All snapshot errors are fatal to the current scan: the engine aborts and
//! the previously committed snapshot remains authoritative.

use std::fmt;
use std::io;
use std::path::Path;

/// Severity levels for snapshot errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Scan fails, process continues
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Snapshot-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    /// I/O failure reading or writing the snapshot file
    FeedSnapshotIo,
    /// Integrity checksum mismatch on load
    FeedSnapshotCorrupt,
    /// Serialization or parse failure
    FeedSnapshotFormat,
}

impl SnapshotErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotErrorCode::FeedSnapshotIo => "FEED_SNAPSHOT_IO",
            SnapshotErrorCode::FeedSnapshotCorrupt => "FEED_SNAPSHOT_CORRUPT",
            SnapshotErrorCode::FeedSnapshotFormat => "FEED_SNAPSHOT_FORMAT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        // A snapshot failure aborts the scan, never the process
        Severity::Error
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot error with code, message, and optional I/O source.
#[derive(Debug)]
pub struct SnapshotError {
    code: SnapshotErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl SnapshotError {
    /// Create an I/O error with context message
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: SnapshotErrorCode::FeedSnapshotIo,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an I/O error referencing a path
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    /// Create a corruption error (integrity checksum mismatch)
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::FeedSnapshotCorrupt,
            message: message.into(),
            source: None,
        }
    }

    /// Create a format error (serialization/parse failure)
    pub fn format_error(message: impl Into<String>) -> Self {
        Self {
            code: SnapshotErrorCode::FeedSnapshotFormat,
            message: message.into(),
            source: None,
        }
    }

    /// The error code
    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    /// The severity
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SnapshotErrorCode::FeedSnapshotIo.code(), "FEED_SNAPSHOT_IO");
        assert_eq!(
            SnapshotErrorCode::FeedSnapshotCorrupt.code(),
            "FEED_SNAPSHOT_CORRUPT"
        );
    }

    #[test]
    fn test_display_includes_code_and_source() {
        let err = SnapshotError::io_error(
            "write failed",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        let text = err.to_string();
        assert!(text.contains("FEED_SNAPSHOT_IO"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn test_severity_is_error() {
        assert_eq!(SnapshotError::corrupt("bad").severity(), Severity::Error);
    }
}
