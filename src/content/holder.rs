//! Content holder with lazy, compute-once checksum
//!
//! A ContentHolder owns the materialized payload of one document: either an
//! in-memory byte buffer or a spill file on disk for payloads past the spill
//! threshold. The digest accumulator has already observed every content byte
//! by the time the holder is constructed; the hex checksum itself is
//! finalized lazily, exactly once, behind a mutex so concurrent readers
//! block until it is available and never race on the accumulator.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Mutex;

use super::digest::ContentDigest;

/// Where the payload bytes live.
enum Payload {
    Memory(Vec<u8>),
    /// Spill file plus its byte length. The holder owns the file and removes
    /// it on drop.
    Spilled { path: PathBuf, len: u64 },
}

enum DigestState {
    /// Accumulator has seen all content bytes but is not finalized yet
    Pending(ContentDigest),
    Finalized(String),
    /// Transient marker while finalizing; never observable after the lock
    /// is released
    Poisoned,
}

/// Materialized content of one document.
pub struct ContentHolder {
    payload: Payload,
    mime_type: String,
    digest: Mutex<DigestState>,
}

impl ContentHolder {
    /// Holder over an in-memory payload whose digest has consumed `bytes`.
    pub(super) fn in_memory(bytes: Vec<u8>, mime_type: String, digest: ContentDigest) -> Self {
        Self {
            payload: Payload::Memory(bytes),
            mime_type,
            digest: Mutex::new(DigestState::Pending(digest)),
        }
    }

    /// Holder over a spill file whose digest has consumed the full stream.
    pub(super) fn spilled(
        path: PathBuf,
        len: u64,
        mime_type: String,
        digest: ContentDigest,
    ) -> Self {
        Self {
            payload: Payload::Spilled { path, len },
            mime_type,
            digest: Mutex::new(DigestState::Pending(digest)),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> u64 {
        match &self.payload {
            Payload::Memory(bytes) => bytes.len() as u64,
            Payload::Spilled { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the payload was spilled to disk.
    pub fn is_spilled(&self) -> bool {
        matches!(self.payload, Payload::Spilled { .. })
    }

    /// Lowercase hex checksum over the exact content bytes.
    ///
    /// First caller finalizes the accumulator; later callers get the stored
    /// value. Querying twice always yields the same string.
    pub fn checksum(&self) -> String {
        let mut state = self.digest.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            DigestState::Finalized(hex) => hex.clone(),
            DigestState::Pending(_) => {
                let pending = std::mem::replace(&mut *state, DigestState::Poisoned);
                let hex = match pending {
                    DigestState::Pending(digest) => digest.finalize(),
                    // unreachable: we matched Pending above under the lock
                    _ => String::new(),
                };
                *state = DigestState::Finalized(hex.clone());
                hex
            }
            DigestState::Poisoned => String::new(),
        }
    }

    /// Open a reader over the payload bytes.
    pub fn reader(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        match &self.payload {
            Payload::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            Payload::Spilled { path, .. } => {
                let file = File::open(path)?;
                Ok(Box::new(file))
            }
        }
    }

    /// Read the full payload into memory.
    ///
    /// Intended for small payloads and tests; large payloads should go
    /// through `reader`.
    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader()?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Drop for ContentHolder {
    fn drop(&mut self) {
        if let Payload::Spilled { path, .. } = &self.payload {
            // Best effort: the spool directory is also swept at scan start
            let _ = fs::remove_file(path);
        }
    }
}

impl std::fmt::Debug for ContentHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHolder")
            .field("mime_type", &self.mime_type)
            .field("len", &self.len())
            .field("spilled", &self.is_spilled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::digest::{digest_bytes, ContentDigest, DigestAlgorithm};

    fn memory_holder(bytes: &[u8]) -> ContentHolder {
        let mut digest = ContentDigest::new(DigestAlgorithm::Sha256);
        digest.update(bytes);
        ContentHolder::in_memory(bytes.to_vec(), "text/plain".to_string(), digest)
    }

    #[test]
    fn test_checksum_matches_one_shot_digest() {
        let holder = memory_holder(b"some content");
        assert_eq!(
            holder.checksum(),
            digest_bytes(DigestAlgorithm::Sha256, b"some content")
        );
    }

    #[test]
    fn test_checksum_stable_across_queries() {
        let holder = memory_holder(b"query me twice");
        assert_eq!(holder.checksum(), holder.checksum());
    }

    #[test]
    fn test_reader_returns_payload() {
        let holder = memory_holder(b"abc");
        assert_eq!(holder.read_to_vec().unwrap(), b"abc");
        assert_eq!(holder.len(), 3);
        assert!(!holder.is_spilled());
    }

    #[test]
    fn test_spilled_holder_removes_file_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spill_0.bin");
        std::fs::write(&path, b"spilled bytes").unwrap();

        let mut digest = ContentDigest::new(DigestAlgorithm::Sha256);
        digest.update(b"spilled bytes");
        let holder =
            ContentHolder::spilled(path.clone(), 13, "application/octet-stream".into(), digest);

        assert!(holder.is_spilled());
        assert_eq!(holder.read_to_vec().unwrap(), b"spilled bytes");
        drop(holder);
        assert!(!path.exists());
    }
}
