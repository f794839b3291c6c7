//! Scan state machine and diff engine
//!
//! One scan is a pipeline over the row source: materialize → build →
//! classify → deliver. The engine streams documents to the sink in
//! row-source order while accumulating the current (id, checksum) set, then
//! diffs that set against the persisted prior snapshot.
//!
//! States: `Idle → Scanning → Diffing → Committed`, with `Aborted` reachable
//! from `Scanning` or `Diffing` on any terminal error.
//!
//! Classification against the prior snapshot:
//! - id absent from prior → NEW, delivered as ADD during `Scanning`
//! - id in both, equal checksum → UNCHANGED, not re-delivered
//! - id in both, differing checksum → CHANGED, delivered as DELETE of the
//!   old identity followed by ADD of the new content (identity is
//!   primary-key based, so a content change is never an in-place update)
//! - id only in prior → REMOVED, delivered as DELETE during `Diffing`, in
//!   persisted snapshot order, after every Scanning-phase delivery
//!
//! Commit atomically replaces the snapshot and drops the checkpoint marker.
//! Abort touches neither: the previous snapshot stays authoritative and the
//! scan is retried in full on the next cycle.
//!
//! A resume replays the deterministic delivery sequence silently until it
//! passes the last acknowledged id. If the source changed and that id never
//! replays, the resume is invalid: the engine drops the marker and aborts so
//! the next cycle delivers everything in a full scan.

mod errors;
mod sink;

pub use errors::{ScanError, ScanResult, SinkError};
pub use sink::{DocumentSink, JsonLinesSink};

use std::collections::HashSet;

use chrono::Utc;

use crate::checkpoint::{CheckpointManager, ResumePosition};
use crate::document::{Document, DocumentBuilder};
use crate::content::Materializer;
use crate::identity::DocumentId;
use crate::observability::{emit, ScanEvent};
use crate::snapshot::{Snapshot, SnapshotEntry, SnapshotStore};
use crate::source::RowSource;

/// Lifecycle of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Diffing,
    Committed,
    Aborted,
}

/// Counters for one scan, logged at commit or abort and returned to the
/// caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub rows_seen: u64,
    pub adds_delivered: u64,
    pub deletes_delivered: u64,
    pub unchanged: u64,
    /// Deliveries suppressed on resume because they were already
    /// acknowledged before the crash
    pub resume_suppressed: u64,
    pub skipped_identity: u64,
    pub skipped_materialization: u64,
    pub skipped_build: u64,
    pub duration_ms: u64,
}

impl ScanStats {
    pub fn skipped_total(&self) -> u64 {
        self.skipped_identity + self.skipped_materialization + self.skipped_build
    }
}

/// Suppresses re-delivery of documents acknowledged before a crash.
///
/// Delivery order is deterministic for unchanged source data, so the resumed
/// scan replays the same sequence and stays silent until it passes the last
/// acknowledged id.
struct DeliveryGate {
    suppress_until: Option<DocumentId>,
}

impl DeliveryGate {
    fn open() -> Self {
        Self {
            suppress_until: None,
        }
    }

    fn until(id: Option<DocumentId>) -> Self {
        Self { suppress_until: id }
    }

    /// Whether this delivery goes to the sink. The delivery matching the
    /// resume id is itself suppressed (it was acknowledged); everything
    /// after flows.
    fn should_deliver(&mut self, id: &DocumentId) -> bool {
        match &self.suppress_until {
            None => true,
            Some(target) if target == id => {
                self.suppress_until = None;
                false
            }
            Some(_) => false,
        }
    }

    /// True while the acknowledged id has not been passed yet. A gate still
    /// closed at the end of the Scanning phase means the source no longer
    /// produces that delivery and the replay assumption is broken.
    fn is_closed(&self) -> bool {
        self.suppress_until.is_some()
    }
}

/// Drives one full scan of one data source.
///
/// The engine exclusively owns the snapshot store and checkpoint manager of
/// its source; the single-scan invariant is enforced by `&mut self` plus an
/// explicit state check.
pub struct ScanEngine {
    builder: DocumentBuilder,
    materializer: Materializer,
    snapshot_store: SnapshotStore,
    checkpoint: CheckpointManager,
    batch_size: usize,
    state: ScanState,
}

impl ScanEngine {
    pub fn new(
        builder: DocumentBuilder,
        materializer: Materializer,
        snapshot_store: SnapshotStore,
        checkpoint: CheckpointManager,
        batch_size: usize,
    ) -> Self {
        Self {
            builder,
            materializer,
            snapshot_store,
            checkpoint,
            batch_size: batch_size.max(1),
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Resume position left behind by an interrupted scan, if any.
    pub fn stored_resume_position(&self) -> ScanResult<Option<ResumePosition>> {
        Ok(self.checkpoint.stored_position()?)
    }

    /// Run a full scan from scratch.
    pub fn run_scan(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn DocumentSink,
    ) -> ScanResult<ScanStats> {
        self.run(source, sink, None)
    }

    /// Re-run an interrupted scan, suppressing deliveries already
    /// acknowledged at the given position.
    pub fn resume(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn DocumentSink,
        position: ResumePosition,
    ) -> ScanResult<ScanStats> {
        self.run(source, sink, Some(position))
    }

    fn run(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn DocumentSink,
        resume: Option<ResumePosition>,
    ) -> ScanResult<ScanStats> {
        if matches!(self.state, ScanState::Scanning | ScanState::Diffing) {
            return Err(ScanError::ScanInProgress);
        }

        let started = std::time::Instant::now();
        let result = self.run_pipeline(source, sink, resume);
        match result {
            Ok(mut stats) => {
                stats.duration_ms = started.elapsed().as_millis() as u64;
                self.state = ScanState::Committed;
                emit(&ScanEvent::Committed {
                    rows: stats.rows_seen,
                    adds: stats.adds_delivered,
                    deletes: stats.deletes_delivered,
                    unchanged: stats.unchanged,
                    skipped: stats.skipped_total(),
                    duration_ms: stats.duration_ms,
                });
                Ok(stats)
            }
            Err(err) => {
                self.state = ScanState::Aborted;
                emit(&ScanEvent::Aborted {
                    error: &err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn run_pipeline(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn DocumentSink,
        resume: Option<ResumePosition>,
    ) -> ScanResult<ScanStats> {
        self.state = ScanState::Scanning;
        let mut stats = ScanStats::default();
        let mut gate = match &resume {
            Some(position) => DeliveryGate::until(position.last_acked.clone()),
            None => DeliveryGate::open(),
        };

        match &resume {
            Some(position) => {
                self.checkpoint.resume_scan(position);
                emit(&ScanEvent::Resumed {
                    last_acked: position
                        .last_acked
                        .as_ref()
                        .map(|id| id.as_str())
                        .unwrap_or("-"),
                });
            }
            None => {
                self.checkpoint.begin_scan(Utc::now())?;
                emit(&ScanEvent::Started);
            }
        }

        let prior = self.snapshot_store.load()?;
        let prior_index = prior.checksum_index();

        let columns = source.columns()?;
        self.materializer.resolve_strategies(&columns);
        self.materializer.sweep_spool();

        let mut current = Snapshot::empty();
        let mut current_ids: HashSet<String> = HashSet::new();

        // Scanning: stream deliveries in row-source order
        let mut offset: u64 = 0;
        loop {
            let batch = source.fetch(offset, self.batch_size)?;
            let batch_len = batch.len();

            for row in &batch {
                stats.rows_seen += 1;
                let document = match self.builder.build(row, &mut self.materializer) {
                    Ok(document) => document,
                    Err(err) => {
                        match err.class() {
                            "identity" => stats.skipped_identity += 1,
                            "materialization" => stats.skipped_materialization += 1,
                            _ => stats.skipped_build += 1,
                        }
                        emit(&ScanEvent::RowSkipped {
                            reason: err.class(),
                            error: &err.to_string(),
                        });
                        continue;
                    }
                };

                let id = document.id().clone();
                let checksum = document.checksum().to_string();
                current.push(SnapshotEntry::new(&id, checksum.clone()));
                current_ids.insert(id.as_str().to_string());

                match prior_index.get(id.as_str()) {
                    None => {
                        self.deliver(sink, &mut gate, &mut stats, document)?;
                    }
                    Some(prior_checksum) if *prior_checksum == checksum => {
                        stats.unchanged += 1;
                    }
                    Some(_) => {
                        self.deliver(sink, &mut gate, &mut stats, Document::delete(id))?;
                        self.deliver(sink, &mut gate, &mut stats, document)?;
                    }
                }
            }

            offset += batch_len as u64;
            if batch_len < self.batch_size {
                break;
            }
        }

        // A resume whose acknowledged delivery never replayed means the
        // source changed underneath the interrupted scan. Committing here
        // would record every suppressed document as already delivered, so
        // the resume is invalidated instead: the marker is dropped and the
        // next cycle performs a full scan.
        if gate.is_closed() {
            self.checkpoint.clear()?;
            return Err(ScanError::StaleResume);
        }

        // Diffing: ids present only in the prior snapshot are REMOVED,
        // delivered after all Scanning-phase deliveries in snapshot order
        self.state = ScanState::Diffing;
        for entry in prior.entries() {
            if !current_ids.contains(entry.doc_id.as_str()) {
                self.deliver(
                    sink,
                    &mut gate,
                    &mut stats,
                    Document::delete(entry.document_id()),
                )?;
            }
        }

        // Committed: wholesale snapshot replacement, then the marker goes
        self.snapshot_store.replace(&current)?;
        self.checkpoint.clear()?;
        Ok(stats)
    }

    fn deliver(
        &mut self,
        sink: &mut dyn DocumentSink,
        gate: &mut DeliveryGate,
        stats: &mut ScanStats,
        document: Document,
    ) -> ScanResult<()> {
        let id = document.id().clone();
        if !gate.should_deliver(&id) {
            stats.resume_suppressed += 1;
            return Ok(());
        }

        self.checkpoint.record_delivery(&id);
        sink.deliver(&document).map_err(|e| ScanError::Sink {
            doc_id: id.as_str().to_string(),
            source: e,
        })?;
        self.checkpoint.acknowledge(&id)?;

        match document.action() {
            crate::document::Action::Add => stats.adds_delivered += 1,
            crate::document::Action::Delete => stats.deletes_delivered += 1,
        }
        Ok(())
    }
}
