//! Column materialization strategies
//!
//! Each content column resolves to exactly one of four strategies, keyed off
//! the column's declared data kind. Resolution happens once per scan from the
//! source's column metadata and is cached; per-row work never touches
//! metadata again.
//!
//! Large-object strategies stream the value in chunks: bytes are fed to the
//! digest accumulator as they arrive, buffered in memory up to the spill
//! threshold, and written to a spool file past it. Peak memory for one row is
//! bounded by the chunk size plus the threshold, independent of payload size.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::source::{ColumnKind, ColumnMeta, LobSource, Row, Value};

use super::digest::{ContentDigest, DigestAlgorithm};
use super::errors::{MaterializationError, MaterializationResult};
use super::holder::ContentHolder;
use super::sniff::{sniff_mime_type, SNIFF_SAMPLE_LEN};

/// The four closed materialization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnStrategy {
    Character,
    Binary,
    LargeCharacter,
    LargeBinary,
}

impl ColumnStrategy {
    fn for_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Character => ColumnStrategy::Character,
            ColumnKind::Binary => ColumnStrategy::Binary,
            ColumnKind::LargeCharacter => ColumnStrategy::LargeCharacter,
            ColumnKind::LargeBinary => ColumnStrategy::LargeBinary,
        }
    }
}

/// Materializes column values into content holders.
///
/// The digest algorithm is fixed at construction; there is no global
/// default. One materializer serves one scan of one source.
pub struct Materializer {
    algorithm: DigestAlgorithm,
    chunk_size: usize,
    spill_threshold: u64,
    spool_dir: PathBuf,
    strategies: HashMap<String, ColumnStrategy>,
    spill_seq: u64,
}

impl Materializer {
    pub fn new(
        algorithm: DigestAlgorithm,
        chunk_size: usize,
        spill_threshold: u64,
        spool_dir: PathBuf,
    ) -> Self {
        Self {
            algorithm,
            chunk_size: chunk_size.max(1),
            spill_threshold,
            spool_dir,
            strategies: HashMap::new(),
            spill_seq: 0,
        }
    }

    /// Prime the strategy cache from the source's column metadata.
    ///
    /// Called once per scan before any row is materialized. Stale entries
    /// from a prior scan are dropped.
    pub fn resolve_strategies(&mut self, columns: &[ColumnMeta]) {
        self.strategies.clear();
        for meta in columns {
            self.strategies
                .entry(meta.name.to_ascii_lowercase())
                .or_insert_with(|| ColumnStrategy::for_kind(meta.kind));
        }
    }

    /// Remove spill files a crashed scan may have left behind.
    ///
    /// Best effort: a file that cannot be removed is simply left in place
    /// and overwritten when its sequence number comes around again.
    pub fn sweep_spool(&mut self) {
        self.spill_seq = 0;
        let entries = match fs::read_dir(&self.spool_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with("spill_") {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    /// The cached strategy for a column, if it resolved.
    pub fn strategy_for(&self, column: &str) -> Option<ColumnStrategy> {
        self.strategies.get(&column.to_ascii_lowercase()).copied()
    }

    /// Materialize one column of one row into a content holder.
    pub fn materialize(
        &mut self,
        row: &Row,
        column: &str,
    ) -> MaterializationResult<ContentHolder> {
        let strategy = self
            .strategy_for(column)
            .ok_or_else(|| MaterializationError::UnknownColumn(column.to_string()))?;
        let value = row.get(column).unwrap_or(&Value::Null);

        match strategy {
            ColumnStrategy::Character => self.materialize_character(column, value),
            ColumnStrategy::Binary => self.materialize_binary(column, value),
            ColumnStrategy::LargeCharacter => self.materialize_large(column, value, true),
            ColumnStrategy::LargeBinary => self.materialize_large(column, value, false),
        }
    }

    /// Materialize an already-rendered text payload, bypassing strategy
    /// resolution. Used for synthetic content such as the metadata-only
    /// rendering of a row.
    pub fn materialize_text(&self, text: &str, mime_type: &str) -> ContentHolder {
        let bytes = text.as_bytes().to_vec();
        let mut digest = ContentDigest::new(self.algorithm);
        digest.update(&bytes);
        ContentHolder::in_memory(bytes, mime_type.to_string(), digest)
    }

    fn materialize_character(
        &self,
        column: &str,
        value: &Value,
    ) -> MaterializationResult<ContentHolder> {
        let text = match value {
            Value::Null => String::new(),
            Value::LargeText(_) | Value::LargeBytes(_) => {
                return Err(MaterializationError::TypeMismatch {
                    column: column.to_string(),
                    expected: "character",
                    found: "large object",
                })
            }
            other => other.render_text().unwrap_or_default(),
        };
        Ok(self.materialize_text(&text, "text/plain"))
    }

    fn materialize_binary(
        &self,
        column: &str,
        value: &Value,
    ) -> MaterializationResult<ContentHolder> {
        // Absence yields a zero-length payload, never a null document
        let bytes = match value {
            Value::Null => Vec::new(),
            Value::Bytes(b) => b.clone(),
            Value::Text(t) => t.as_bytes().to_vec(),
            other => {
                return Err(MaterializationError::TypeMismatch {
                    column: column.to_string(),
                    expected: "binary",
                    found: value_kind(other),
                })
            }
        };

        let sample_len = bytes.len().min(SNIFF_SAMPLE_LEN);
        let mime = sniff_mime_type(&bytes[..sample_len]).to_string();
        let mut digest = ContentDigest::new(self.algorithm);
        digest.update(&bytes);
        Ok(ContentHolder::in_memory(bytes, mime, digest))
    }

    fn materialize_large(
        &mut self,
        column: &str,
        value: &Value,
        character: bool,
    ) -> MaterializationResult<ContentHolder> {
        let lob: &dyn LobSource = match value {
            Value::LargeText(lob) | Value::LargeBytes(lob) => lob.as_ref(),
            // Sources may inline small LOB values; fall back to the inline
            // strategies rather than failing the row.
            Value::Null | Value::Text(_) | Value::Bytes(_) => {
                return if character {
                    self.materialize_character(column, value)
                } else {
                    self.materialize_binary(column, value)
                };
            }
            other => {
                return Err(MaterializationError::TypeMismatch {
                    column: column.to_string(),
                    expected: "large object",
                    found: value_kind(other),
                })
            }
        };

        let reader = lob.open().map_err(|e| MaterializationError::LobRead {
            column: column.to_string(),
            source: e,
        })?;
        self.stream_lob(column, reader, character)
    }

    fn stream_lob(
        &mut self,
        column: &str,
        mut reader: Box<dyn Read + Send>,
        character: bool,
    ) -> MaterializationResult<ContentHolder> {
        let mut digest = ContentDigest::new(self.algorithm);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut buffered: Vec<u8> = Vec::new();
        let mut spill: Option<(PathBuf, File)> = None;
        let mut total: u64 = 0;
        let mut sample: Vec<u8> = Vec::with_capacity(SNIFF_SAMPLE_LEN);

        loop {
            let n = reader
                .read(&mut chunk)
                .map_err(|e| MaterializationError::LobRead {
                    column: column.to_string(),
                    source: e,
                })?;
            if n == 0 {
                break;
            }
            let bytes = &chunk[..n];
            digest.update(bytes);
            total += n as u64;

            if sample.len() < SNIFF_SAMPLE_LEN {
                let take = (SNIFF_SAMPLE_LEN - sample.len()).min(n);
                sample.extend_from_slice(&bytes[..take]);
            }

            match &mut spill {
                Some((_, file)) => {
                    file.write_all(bytes)
                        .map_err(|e| MaterializationError::Spill { source: e })?;
                }
                None => {
                    buffered.extend_from_slice(bytes);
                    if buffered.len() as u64 > self.spill_threshold {
                        let (path, mut file) = self.open_spill_file()?;
                        file.write_all(&buffered)
                            .map_err(|e| MaterializationError::Spill { source: e })?;
                        buffered = Vec::new();
                        spill = Some((path, file));
                    }
                }
            }
        }

        let mime = if character {
            "text/plain".to_string()
        } else {
            sniff_mime_type(&sample).to_string()
        };

        match spill {
            Some((path, file)) => {
                file.sync_all()
                    .map_err(|e| MaterializationError::Spill { source: e })?;
                drop(file);
                Ok(ContentHolder::spilled(path, total, mime, digest))
            }
            None => Ok(ContentHolder::in_memory(buffered, mime, digest)),
        }
    }

    fn open_spill_file(&mut self) -> MaterializationResult<(PathBuf, File)> {
        fs::create_dir_all(&self.spool_dir)
            .map_err(|e| MaterializationError::Spill { source: e })?;
        let path = self
            .spool_dir
            .join(format!("spill_{:06}.bin", self.spill_seq));
        self.spill_seq += 1;
        let file = File::create(&path).map_err(|e| MaterializationError::Spill { source: e })?;
        Ok((path, file))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Text(_) => "text",
        Value::Bytes(_) => "bytes",
        Value::LargeText(_) | Value::LargeBytes(_) => "large object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::digest::digest_bytes;
    use crate::source::MemoryLob;
    use tempfile::TempDir;

    fn materializer(spool: &TempDir) -> Materializer {
        let mut m = Materializer::new(
            DigestAlgorithm::Sha256,
            64,
            256,
            spool.path().to_path_buf(),
        );
        m.resolve_strategies(&[
            ColumnMeta::new("name", ColumnKind::Character),
            ColumnMeta::new("data", ColumnKind::Binary),
            ColumnMeta::new("body", ColumnKind::LargeCharacter),
            ColumnMeta::new("blob", ColumnKind::LargeBinary),
        ]);
        m
    }

    #[test]
    fn test_strategy_resolution_is_cached_and_case_insensitive() {
        let spool = TempDir::new().unwrap();
        let m = materializer(&spool);
        assert_eq!(m.strategy_for("NAME"), Some(ColumnStrategy::Character));
        assert_eq!(m.strategy_for("blob"), Some(ColumnStrategy::LargeBinary));
        assert_eq!(m.strategy_for("nope"), None);
    }

    #[test]
    fn test_character_strategy_utf8_bytes() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("name", Value::Text("héllo".into()));

        let holder = m.materialize(&row, "name").unwrap();
        assert_eq!(holder.read_to_vec().unwrap(), "héllo".as_bytes());
        assert_eq!(holder.mime_type(), "text/plain");
        assert_eq!(
            holder.checksum(),
            digest_bytes(DigestAlgorithm::Sha256, "héllo".as_bytes())
        );
    }

    #[test]
    fn test_binary_strategy_null_is_zero_length() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("data", Value::Null);

        let holder = m.materialize(&row, "data").unwrap();
        assert!(holder.is_empty());
        assert_eq!(
            holder.checksum(),
            digest_bytes(DigestAlgorithm::Sha256, b"")
        );
    }

    #[test]
    fn test_large_binary_spills_past_threshold() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        // 10 KiB payload against a 256 byte threshold
        let payload: Vec<u8> = (0..10_240).map(|i| (i % 251) as u8).collect();
        let row = Row::new().with("blob", Value::LargeBytes(MemoryLob::shared(payload.clone())));

        let holder = m.materialize(&row, "blob").unwrap();
        assert!(holder.is_spilled());
        assert_eq!(holder.len(), payload.len() as u64);
        assert_eq!(holder.read_to_vec().unwrap(), payload);
        assert_eq!(
            holder.checksum(),
            digest_bytes(DigestAlgorithm::Sha256, &payload)
        );
    }

    #[test]
    fn test_large_character_small_value_stays_in_memory() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("body", Value::LargeText(MemoryLob::shared(b"short".to_vec())));

        let holder = m.materialize(&row, "body").unwrap();
        assert!(!holder.is_spilled());
        assert_eq!(holder.mime_type(), "text/plain");
        assert_eq!(holder.read_to_vec().unwrap(), b"short");
    }

    #[test]
    fn test_large_strategy_accepts_inline_value() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("blob", Value::Bytes(b"inline".to_vec()));

        let holder = m.materialize(&row, "blob").unwrap();
        assert_eq!(holder.read_to_vec().unwrap(), b"inline");
    }

    #[test]
    fn test_unknown_column_fails() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("x", Value::Null);
        assert!(matches!(
            m.materialize(&row, "x"),
            Err(MaterializationError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_failing_lob_surfaces_lob_read_error() {
        struct BrokenLob;
        impl LobSource for BrokenLob {
            fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "backend gone"))
            }
        }

        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("blob", Value::LargeBytes(std::sync::Arc::new(BrokenLob)));

        assert!(matches!(
            m.materialize(&row, "blob"),
            Err(MaterializationError::LobRead { .. })
        ));
    }

    #[test]
    fn test_binary_mime_sniffed_from_sample() {
        let spool = TempDir::new().unwrap();
        let mut m = materializer(&spool);
        let row = Row::new().with("data", Value::Bytes(b"%PDF-1.4 ...".to_vec()));

        let holder = m.materialize(&row, "data").unwrap();
        assert_eq!(holder.mime_type(), "application/pdf");
    }
}
