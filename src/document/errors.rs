//! Document assembly error types
//!
//! Row-level failures are values, not control flow: each row produces either
//! a document or a classified `RowError`, and the scan loop aggregates the
//! errors into skip counters. Nothing in this module aborts a scan.

use thiserror::Error;

use crate::content::MaterializationError;
use crate::identity::IdentityError;

/// Result type for per-row document construction
pub type BuildResult<T> = Result<T, RowError>;

/// Failures assembling a document that are not identity or materialization
/// problems.
#[derive(Debug, Error)]
pub enum BuildError {
    /// External-reference variant found no usable reference value
    #[error("Reference column '{0}' is missing or null")]
    MissingReference(String),

    /// The synthetic metadata rendering could not be serialized
    #[error("Failed to render row metadata: {0}")]
    Render(#[from] serde_json::Error),
}

/// Classified per-row failure.
///
/// The class determines which skip counter the scan loop bumps.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl RowError {
    /// Short class tag used in skip logs and statistics.
    pub fn class(&self) -> &'static str {
        match self {
            RowError::Identity(_) => "identity",
            RowError::Materialization(_) => "materialization",
            RowError::Build(_) => "build",
        }
    }
}
