//! tablefeed - incremental table-to-document feed pipeline
//!
//! Re-scans a relational table and produces a stream of addressable,
//! checksummed documents, diffed against the snapshot of the previous
//! completed scan.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod content;
pub mod document;
pub mod identity;
pub mod observability;
pub mod scan;
pub mod snapshot;
pub mod source;
