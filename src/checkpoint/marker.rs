//! Checkpoint marker file handling
//!
//! The marker records scan progress durably:
//! - scan_started_at: RFC3339 timestamp of the scan the marker belongs to
//! - last_acked_doc_id: the newest document whose delivery (and every
//!   delivery before it) the consumer has acknowledged
//! - format_version: always 1
//!
//! Location: `<data_dir>/checkpoint.json`
//!
//! The marker is written after each checkpoint advance and removed at scan
//! commit. Presence of a marker at startup means the previous scan did not
//! complete and delivery should resume past `last_acked_doc_id`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CheckpointError, CheckpointResult};

pub const MARKER_FILE: &str = "checkpoint.json";

/// Durable checkpoint marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointMarker {
    /// Start timestamp of the scan this marker belongs to (RFC3339)
    pub scan_started_at: String,

    /// Last acknowledged document id; None before the first acknowledgment
    pub last_acked_doc_id: Option<String>,

    /// Format version (always 1)
    pub format_version: u8,
}

impl CheckpointMarker {
    pub fn new(scan_started_at: impl Into<String>, last_acked_doc_id: Option<String>) -> Self {
        Self {
            scan_started_at: scan_started_at.into(),
            last_acked_doc_id,
            format_version: 1,
        }
    }

    /// Serializes the marker to JSON
    pub fn to_json(&self) -> CheckpointResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            CheckpointError::format_error(format!("Failed to serialize checkpoint marker: {}", e))
        })
    }

    /// Deserializes the marker from JSON
    pub fn from_json(json: &str) -> CheckpointResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            CheckpointError::format_error(format!("Failed to parse checkpoint marker: {}", e))
        })
    }

    /// Writes the marker to a file with fsync.
    ///
    /// The marker must be durable before the delivery it records is treated
    /// as checkpointed.
    pub fn write_to_file(&self, path: &Path) -> CheckpointResult<()> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CheckpointError::io_error(
                        format!("Failed to create marker directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let mut file = File::create(path).map_err(|e| {
            CheckpointError::io_error(
                format!("Failed to create marker file: {}", path.display()),
                e,
            )
        })?;
        file.write_all(json.as_bytes()).map_err(|e| {
            CheckpointError::io_error(format!("Failed to write marker: {}", path.display()), e)
        })?;
        file.sync_all().map_err(|e| {
            CheckpointError::io_error(format!("fsync failed for marker: {}", path.display()), e)
        })
    }

    /// Reads the marker from a file. `Ok(None)` when no marker exists.
    pub fn read_from_file(path: &Path) -> CheckpointResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|e| {
            CheckpointError::io_error(format!("Failed to read marker: {}", path.display()), e)
        })?;
        Self::from_json(&json).map(Some)
    }

    /// Removes the marker file, tolerating its absence.
    pub fn remove(path: &Path) -> CheckpointResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::io_error(
                format!("Failed to remove marker: {}", path.display()),
                e,
            )),
        }
    }
}

/// Path of the marker file inside a data directory.
pub fn marker_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MARKER_FILE)
}
