//! Content materialization subsystem
//!
//! Turns column values, including large objects, into memory-bounded
//! content holders with a lazily finalized checksum.
//!
//! # Design principles
//!
//! - Strategy per column kind, resolved once per scan and cached
//! - Digest algorithm is explicit configuration, never global state
//! - Peak memory bounded by chunk size plus spill threshold
//! - Per-row failures never abort the scan

mod digest;
mod errors;
mod holder;
mod materializer;
mod sniff;

pub use digest::{digest_bytes, ContentDigest, DigestAlgorithm};
pub use errors::{MaterializationError, MaterializationResult};
pub use holder::ContentHolder;
pub use materializer::{ColumnStrategy, Materializer};
pub use sniff::{sniff_mime_type, SNIFF_SAMPLE_LEN};
