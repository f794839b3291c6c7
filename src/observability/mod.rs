//! Observability for the feed pipeline
//!
//! Structured JSON logging of scan lifecycle events and per-row skips,
//! emitted on stderr: the document stream owns stdout. One log line = one
//! event, synchronous, no buffering.

mod logger;

pub use logger::{emit, ScanEvent, Severity};
