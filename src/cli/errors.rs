//! CLI-specific error types
//!
//! All CLI errors are fatal: the command prints the error and exits
//! non-zero.

use std::fmt;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Scan failed
    ScanFailed,
    /// I/O error (output file, state directory)
    IoError,
    /// A document id or token could not be decoded
    DecodeError,
    /// Nothing to resume
    NoCheckpoint,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "FEED_CLI_CONFIG_ERROR",
            Self::ScanFailed => "FEED_CLI_SCAN_FAILED",
            Self::IoError => "FEED_CLI_IO_ERROR",
            Self::DecodeError => "FEED_CLI_DECODE_ERROR",
            Self::NoCheckpoint => "FEED_CLI_NO_CHECKPOINT",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config(message: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::ConfigError, message.to_string())
    }

    pub fn scan(message: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::ScanFailed, message.to_string())
    }

    pub fn io(message: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::IoError, message.to_string())
    }

    pub fn decode(message: impl fmt::Display) -> Self {
        Self::new(CliErrorCode::DecodeError, message.to_string())
    }

    pub fn no_checkpoint() -> Self {
        Self::new(
            CliErrorCode::NoCheckpoint,
            "no checkpoint marker found and no token supplied",
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = CliError::config("bad file");
        assert!(err.to_string().contains("FEED_CLI_CONFIG_ERROR"));
        assert!(err.to_string().contains("bad file"));
    }
}
