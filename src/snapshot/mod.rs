//! Snapshot subsystem
//!
//! The snapshot is the persisted record of (document id, checksum) pairs
//! from the last completed scan. It is the baseline incremental diffs are
//! computed against.
//!
//! # Design principles
//!
//! - Atomic visibility: temp-write-then-rename, never a partial file
//! - Wholesale replacement only at scan commit
//! - Explicit integrity verification on load
//! - An aborted scan leaves the previous snapshot authoritative

mod errors;
mod integrity;
mod store;

pub use errors::{Severity, SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use integrity::{compute_checksum, format_checksum, parse_checksum, verify_checksum};
pub use store::{Snapshot, SnapshotEntry, SnapshotStore, SNAPSHOT_FILE};
