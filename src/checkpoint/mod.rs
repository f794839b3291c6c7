//! Checkpoint subsystem
//!
//! Tracks scan progress and in-flight documents so delivery is resumable
//! after a crash. The engine is at-least-once: a document delivered but not
//! yet acknowledged when the process dies is redelivered on resume, and a
//! consumer that de-duplicates by document id sees each document effectively
//! once.
//!
//! # Design principles
//!
//! - A token is only valid once every delivery up to and including it has
//!   been acknowledged
//! - Durable marker before the checkpoint is considered advanced
//! - Resume never skips a document
//! - Tokens are opaque to the consumer and passed back verbatim

mod errors;
mod marker;
mod queue;

pub use errors::{CheckpointError, CheckpointErrorCode, CheckpointResult};
pub use marker::{marker_path, CheckpointMarker, MARKER_FILE};
pub use queue::InFlightQueue;

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::identity::DocumentId;

/// Opaque, durable resume token.
///
/// Encodes (scan-start timestamp, last-acknowledged document id). Consumers
/// store it verbatim and hand it back to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointToken(String);

impl CheckpointToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn encode(marker: &CheckpointMarker) -> CheckpointResult<Self> {
        let json = serde_json::to_string(marker).map_err(|e| {
            CheckpointError::format_error(format!("Failed to encode token: {}", e))
        })?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json.as_bytes())))
    }

    fn decode(&self) -> CheckpointResult<CheckpointMarker> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| CheckpointError::bad_token(format!("Token is not base64: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| CheckpointError::bad_token(format!("Token is not UTF-8: {}", e)))?;
        CheckpointMarker::from_json(&json)
            .map_err(|e| CheckpointError::bad_token(format!("Token payload invalid: {}", e)))
    }
}

impl std::fmt::Display for CheckpointToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a resumed scan re-enters delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePosition {
    /// Start timestamp of the interrupted scan
    pub scan_started_at: DateTime<Utc>,
    /// Deliveries up to and including this id are already acknowledged
    pub last_acked: Option<DocumentId>,
}

/// Manages the durable checkpoint of one data source.
///
/// Exclusively owned by one diff engine instance at a time; the single-scan
/// invariant rules out concurrent writers by construction.
#[derive(Debug)]
pub struct CheckpointManager {
    marker_file: PathBuf,
    scan_started_at: String,
    queue: InFlightQueue,
}

impl CheckpointManager {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            marker_file: marker_path(data_dir),
            scan_started_at: String::new(),
            queue: InFlightQueue::new(),
        }
    }

    /// Begin tracking a new scan. Clears in-flight state and stamps the
    /// marker with the scan start so later tokens identify the scan.
    pub fn begin_scan(&mut self, started_at: DateTime<Utc>) -> CheckpointResult<()> {
        self.scan_started_at = started_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.queue.clear();
        CheckpointMarker::new(self.scan_started_at.clone(), None)
            .write_to_file(&self.marker_file)
    }

    /// Re-attach to an interrupted scan without disturbing the durable
    /// marker: the on-disk last-acked id is the whole point of resuming.
    pub fn resume_scan(&mut self, position: &ResumePosition) {
        self.scan_started_at = position
            .scan_started_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        self.queue.clear();
    }

    /// Record that a document was handed to the consumer.
    pub fn record_delivery(&mut self, id: &DocumentId) {
        self.queue.push(id.clone());
    }

    /// Documents delivered but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Acknowledge one delivery.
    ///
    /// When the acknowledged prefix of the delivery order grows, the marker
    /// is persisted and the new token returned. An acknowledgment that
    /// leaves an earlier delivery unacknowledged returns `Ok(None)` and the
    /// durable checkpoint stays where it was.
    pub fn acknowledge(
        &mut self,
        id: &DocumentId,
    ) -> CheckpointResult<Option<CheckpointToken>> {
        if !self.queue.acknowledge(id) {
            return Ok(None);
        }
        let advanced_to = match self.queue.advance() {
            Some(id) => id,
            None => return Ok(None),
        };

        let marker = CheckpointMarker::new(
            self.scan_started_at.clone(),
            Some(advanced_to.as_str().to_string()),
        );
        marker.write_to_file(&self.marker_file)?;
        CheckpointToken::encode(&marker).map(Some)
    }

    /// Decode a consumer-held token into a resume position.
    pub fn resume_from(token: &CheckpointToken) -> CheckpointResult<ResumePosition> {
        let marker = token.decode()?;
        marker_to_position(&marker)
    }

    /// Resume position recorded on disk, if an interrupted scan left one.
    pub fn stored_position(&self) -> CheckpointResult<Option<ResumePosition>> {
        match CheckpointMarker::read_from_file(&self.marker_file)? {
            Some(marker) => marker_to_position(&marker).map(Some),
            None => Ok(None),
        }
    }

    /// Drop the marker at scan commit; a completed scan needs no resume.
    pub fn clear(&mut self) -> CheckpointResult<()> {
        self.queue.clear();
        CheckpointMarker::remove(&self.marker_file)
    }
}

fn marker_to_position(marker: &CheckpointMarker) -> CheckpointResult<ResumePosition> {
    let scan_started_at = DateTime::parse_from_rfc3339(&marker.scan_started_at)
        .map_err(|e| {
            CheckpointError::format_error(format!(
                "Invalid scan timestamp '{}': {}",
                marker.scan_started_at, e
            ))
        })?
        .with_timezone(&Utc);
    Ok(ResumePosition {
        scan_started_at,
        last_acked: marker
            .last_acked_doc_id
            .clone()
            .map(DocumentId::from_encoded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn id(s: &str) -> DocumentId {
        DocumentId::from_encoded(s)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 4, 11, 30, 0).unwrap()
    }

    #[test]
    fn test_acknowledge_advances_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut mgr = CheckpointManager::open(dir.path());
        mgr.begin_scan(start()).unwrap();

        mgr.record_delivery(&id("a"));
        mgr.record_delivery(&id("b"));

        let token = mgr.acknowledge(&id("a")).unwrap().expect("token");
        let pos = CheckpointManager::resume_from(&token).unwrap();
        assert_eq!(pos.last_acked, Some(id("a")));
        assert_eq!(pos.scan_started_at, start());

        // disk agrees with the token
        let stored = mgr.stored_position().unwrap().unwrap();
        assert_eq!(stored, pos);
    }

    #[test]
    fn test_out_of_order_ack_does_not_advance() {
        let dir = TempDir::new().unwrap();
        let mut mgr = CheckpointManager::open(dir.path());
        mgr.begin_scan(start()).unwrap();

        mgr.record_delivery(&id("a"));
        mgr.record_delivery(&id("b"));

        assert!(mgr.acknowledge(&id("b")).unwrap().is_none());
        let stored = mgr.stored_position().unwrap().unwrap();
        assert_eq!(stored.last_acked, None);

        // acking the gap releases both
        let token = mgr.acknowledge(&id("a")).unwrap().expect("token");
        let pos = CheckpointManager::resume_from(&token).unwrap();
        assert_eq!(pos.last_acked, Some(id("b")));
    }

    #[test]
    fn test_clear_removes_marker() {
        let dir = TempDir::new().unwrap();
        let mut mgr = CheckpointManager::open(dir.path());
        mgr.begin_scan(start()).unwrap();
        mgr.clear().unwrap();
        assert!(mgr.stored_position().unwrap().is_none());
    }

    #[test]
    fn test_marker_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let mut mgr = CheckpointManager::open(dir.path());
        mgr.begin_scan(start()).unwrap();
        mgr.record_delivery(&id("a"));
        mgr.acknowledge(&id("a")).unwrap();
        drop(mgr);

        let reopened = CheckpointManager::open(dir.path());
        let stored = reopened.stored_position().unwrap().unwrap();
        assert_eq!(stored.last_acked, Some(id("a")));
    }

    #[test]
    fn test_bad_token_is_rejected() {
        let token = CheckpointToken::from_string("!!not-base64!!");
        let err = CheckpointManager::resume_from(&token).unwrap_err();
        assert_eq!(err.code().code(), "FEED_CHECKPOINT_TOKEN");
    }

    #[test]
    fn test_token_roundtrips_verbatim() {
        let dir = TempDir::new().unwrap();
        let mut mgr = CheckpointManager::open(dir.path());
        mgr.begin_scan(start()).unwrap();
        mgr.record_delivery(&id("a"));
        let token = mgr.acknowledge(&id("a")).unwrap().unwrap();

        // a consumer stores the string form and hands it back
        let copied = CheckpointToken::from_string(token.as_str());
        assert_eq!(
            CheckpointManager::resume_from(&copied).unwrap(),
            CheckpointManager::resume_from(&token).unwrap()
        );
    }
}
