//! Checkpoint error types
//!
//! Error codes:
//! - FEED_CHECKPOINT_IO (ERROR severity)
//! - FEED_CHECKPOINT_FORMAT (ERROR severity)
//! - FEED_CHECKPOINT_TOKEN (ERROR severity)
//!
//! Checkpoint failures are fatal to the current scan, like snapshot
//! failures: the engine aborts rather than risk double delivery accounting.

use std::fmt;
use std::io;

/// Checkpoint-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointErrorCode {
    /// I/O failure reading or writing the marker file
    FeedCheckpointIo,
    /// Marker serialization or parse failure
    FeedCheckpointFormat,
    /// A resume token could not be decoded
    FeedCheckpointToken,
}

impl CheckpointErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CheckpointErrorCode::FeedCheckpointIo => "FEED_CHECKPOINT_IO",
            CheckpointErrorCode::FeedCheckpointFormat => "FEED_CHECKPOINT_FORMAT",
            CheckpointErrorCode::FeedCheckpointToken => "FEED_CHECKPOINT_TOKEN",
        }
    }
}

impl fmt::Display for CheckpointErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Checkpoint error with code, message, and optional I/O source.
#[derive(Debug)]
pub struct CheckpointError {
    code: CheckpointErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl CheckpointError {
    /// Create an I/O error with context message
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: CheckpointErrorCode::FeedCheckpointIo,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a marker format error
    pub fn format_error(message: impl Into<String>) -> Self {
        Self {
            code: CheckpointErrorCode::FeedCheckpointFormat,
            message: message.into(),
            source: None,
        }
    }

    /// Create a bad-token error
    pub fn bad_token(message: impl Into<String>) -> Self {
        Self {
            code: CheckpointErrorCode::FeedCheckpointToken,
            message: message.into(),
            source: None,
        }
    }

    /// The error code
    pub fn code(&self) -> CheckpointErrorCode {
        self.code
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CheckpointErrorCode::FeedCheckpointIo.code(),
            "FEED_CHECKPOINT_IO"
        );
        assert_eq!(
            CheckpointErrorCode::FeedCheckpointToken.code(),
            "FEED_CHECKPOINT_TOKEN"
        );
    }

    #[test]
    fn test_display_format() {
        let err = CheckpointError::bad_token("garbage token");
        assert!(err.to_string().contains("FEED_CHECKPOINT_TOKEN"));
        assert!(err.to_string().contains("garbage token"));
    }
}
