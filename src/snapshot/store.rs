//! Persisted snapshot store
//!
//! The snapshot file records the (document id, checksum) pairs of the last
//! completed scan, in delivery order. It is replaced wholesale at scan
//! commit with temp-write-then-rename discipline: write `snapshot.json.tmp`,
//! fsync it, rename over `snapshot.json`, fsync the directory. A crashed or
//! aborted scan therefore never leaves a partially written snapshot
//! observable.
//!
//! File format:
//! ```json
//! {
//!   "format_version": 1,
//!   "created_at": "2026-02-04T11:30:00Z",
//!   "entry_checksum": "crc32:deadbeef",
//!   "entries": [
//!     {"doc_id": "MSxsYXN0XzAx", "checksum": "9f86d0..."}
//!   ]
//! }
//! ```
//!
//! `entry_checksum` covers the serialized entries array and is verified on
//! every load.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::DocumentId;

use super::errors::{SnapshotError, SnapshotResult};
use super::integrity::{compute_checksum, format_checksum, verify_checksum};

pub const SNAPSHOT_FILE: &str = "snapshot.json";
const SNAPSHOT_TMP_FILE: &str = "snapshot.json.tmp";

/// One (identity, checksum) pair of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub doc_id: String,
    pub checksum: String,
}

impl SnapshotEntry {
    pub fn new(doc_id: &DocumentId, checksum: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.as_str().to_string(),
            checksum: checksum.into(),
        }
    }

    pub fn document_id(&self) -> DocumentId {
        DocumentId::from_encoded(self.doc_id.clone())
    }
}

/// Ordered document set of the most recent completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: SnapshotEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were delivered, which is the order REMOVED
    /// deletes are later emitted in.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Checksum lookup table keyed by encoded document id.
    pub fn checksum_index(&self) -> HashMap<&str, &str> {
        self.entries
            .iter()
            .map(|e| (e.doc_id.as_str(), e.checksum.as_str()))
            .collect()
    }
}

/// On-disk snapshot envelope.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    format_version: u8,
    created_at: String,
    entry_checksum: String,
    entries: Vec<SnapshotEntry>,
}

/// Owns the snapshot file of one data source.
///
/// Exclusive ownership is by construction: one diff engine instance holds
/// the store for the duration of a scan, and scans never overlap per source.
#[derive(Debug)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_TMP_FILE)
    }

    /// Load the committed snapshot. A missing file is an empty snapshot
    /// (first scan); a corrupt or unreadable file is an error.
    pub fn load(&self) -> SnapshotResult<Snapshot> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(Snapshot::empty());
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| SnapshotError::io_error_at_path(&path, e))?;
        let file: SnapshotFile = serde_json::from_str(&json).map_err(|e| {
            SnapshotError::format_error(format!(
                "Failed to parse snapshot file {}: {}",
                path.display(),
                e
            ))
        })?;

        let entry_json = serde_json::to_string(&file.entries).map_err(|e| {
            SnapshotError::format_error(format!("Failed to reserialize entries: {}", e))
        })?;
        if !verify_checksum(entry_json.as_bytes(), &file.entry_checksum) {
            return Err(SnapshotError::corrupt(format!(
                "Snapshot integrity checksum mismatch in {}",
                path.display()
            )));
        }

        Ok(Snapshot::from_entries(file.entries))
    }

    /// Atomically replace the committed snapshot.
    ///
    /// Called exactly once per scan, at commit. Any failure leaves the
    /// previous snapshot file untouched.
    pub fn replace(&self, snapshot: &Snapshot) -> SnapshotResult<()> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| SnapshotError::io_error_at_path(&self.data_dir, e))?;

        let entry_json = serde_json::to_string(snapshot.entries()).map_err(|e| {
            SnapshotError::format_error(format!("Failed to serialize entries: {}", e))
        })?;
        let file = SnapshotFile {
            format_version: 1,
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            entry_checksum: format_checksum(compute_checksum(entry_json.as_bytes())),
            entries: snapshot.entries().to_vec(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| {
            SnapshotError::format_error(format!("Failed to serialize snapshot: {}", e))
        })?;

        let tmp = self.tmp_path();
        let mut tmp_file =
            File::create(&tmp).map_err(|e| SnapshotError::io_error_at_path(&tmp, e))?;
        tmp_file
            .write_all(json.as_bytes())
            .map_err(|e| SnapshotError::io_error_at_path(&tmp, e))?;
        tmp_file
            .sync_all()
            .map_err(|e| SnapshotError::io_error_at_path(&tmp, e))?;
        drop(tmp_file);

        let path = self.snapshot_path();
        fs::rename(&tmp, &path).map_err(|e| {
            SnapshotError::io_error(
                format!("Failed to rename {} to {}", tmp.display(), path.display()),
                e,
            )
        })?;
        fsync_dir(&self.data_dir)
    }
}

/// fsync a directory so the rename is durable.
fn fsync_dir(path: &Path) -> SnapshotResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| SnapshotError::io_error_at_path(path, e))?;
    dir.sync_all().map_err(|e| {
        SnapshotError::io_error(format!("fsync directory failed: {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, checksum: &str) -> SnapshotEntry {
        SnapshotEntry {
            doc_id: id.to_string(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_replace_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = Snapshot::from_entries(vec![entry("id1", "c1"), entry("id2", "c2")]);
        store.replace(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
        // order preserved
        assert_eq!(loaded.entries()[0].doc_id, "id1");
    }

    #[test]
    fn test_replace_is_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .replace(&Snapshot::from_entries(vec![entry("old", "c")]))
            .unwrap();
        store
            .replace(&Snapshot::from_entries(vec![entry("new", "c")]))
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].doc_id, "new");
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .replace(&Snapshot::from_entries(vec![entry("id1", "c1")]))
            .unwrap();

        // Flip the stored checksum so entries no longer match
        let path = store.snapshot_path();
        let json = fs::read_to_string(&path).unwrap();
        let tampered = json.replace("\"c1\"", "\"c2\"");
        fs::write(&path, tampered).unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.code().code(), "FEED_SNAPSHOT_CORRUPT");
    }

    #[test]
    fn test_garbage_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.snapshot_path(), b"not json at all").unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.code().code(), "FEED_SNAPSHOT_FORMAT");
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .replace(&Snapshot::from_entries(vec![entry("id1", "c1")]))
            .unwrap();
        assert!(!dir.path().join(SNAPSHOT_TMP_FILE).exists());
    }

    #[test]
    fn test_checksum_index() {
        let snapshot = Snapshot::from_entries(vec![entry("a", "1"), entry("b", "2")]);
        let index = snapshot.checksum_index();
        assert_eq!(index.get("a"), Some(&"1"));
        assert_eq!(index.get("b"), Some(&"2"));
        assert_eq!(index.get("c"), None);
    }
}
