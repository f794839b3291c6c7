//! In-memory row source
//!
//! Implements the row source contract over a fixed set of rows. Used by the
//! test suites and by inline-source configurations where the row set is small
//! enough to ship in the config file.

use std::io::{self, Cursor, Read};
use std::sync::Arc;

use super::{ColumnMeta, LobSource, Row, RowSource, SourceError, SourceResult};

/// A large object backed by an in-memory byte buffer.
///
/// `open` hands out a fresh cursor each time, so repeated materialization
/// attempts see the full value.
pub struct MemoryLob {
    bytes: Vec<u8>,
}

impl MemoryLob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Convenience wrapper producing the `Arc<dyn LobSource>` a `Value` wants.
    pub fn shared(bytes: impl Into<Vec<u8>>) -> Arc<dyn LobSource> {
        Arc::new(Self::new(bytes))
    }
}

impl LobSource for MemoryLob {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}

/// Fixed-content row source with offset/limit pagination.
pub struct MemorySource {
    columns: Vec<ColumnMeta>,
    rows: Vec<Row>,
    /// When set, `fetch` fails at this offset. Test hook for abort paths.
    fail_at_offset: Option<u64>,
}

impl MemorySource {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            fail_at_offset: None,
        }
    }

    /// Make `fetch` fail once the given offset is requested.
    pub fn fail_at(mut self, offset: u64) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }
}

impl RowSource for MemorySource {
    fn columns(&mut self) -> SourceResult<Vec<ColumnMeta>> {
        Ok(self.columns.clone())
    }

    fn fetch(&mut self, offset: u64, limit: usize) -> SourceResult<Vec<Row>> {
        if let Some(fail) = self.fail_at_offset {
            if offset >= fail {
                return Err(SourceError::FetchFailed {
                    offset,
                    message: "injected source failure".to_string(),
                });
            }
        }

        let start = offset as usize;
        if start >= self.rows.len() {
            return Ok(Vec::new());
        }
        let end = (start + limit).min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ColumnKind, Value};

    fn sample_source() -> MemorySource {
        let columns = vec![
            ColumnMeta::new("id", ColumnKind::Character),
            ColumnMeta::new("name", ColumnKind::Character),
        ];
        let rows = (0..5)
            .map(|i| {
                Row::new()
                    .with("id", Value::Integer(i))
                    .with("name", Value::Text(format!("name_{}", i)))
            })
            .collect();
        MemorySource::new(columns, rows)
    }

    #[test]
    fn test_fetch_paginates_in_order() {
        let mut source = sample_source();

        let first = source.fetch(0, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert!(matches!(first[0].get("id"), Some(Value::Integer(0))));

        let second = source.fetch(2, 2).unwrap();
        assert!(matches!(second[0].get("id"), Some(Value::Integer(2))));
    }

    #[test]
    fn test_short_batch_signals_end() {
        let mut source = sample_source();
        let tail = source.fetch(4, 10).unwrap();
        assert_eq!(tail.len(), 1);
        let empty = source.fetch(5, 10).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let mut source = sample_source().fail_at(2);
        assert!(source.fetch(0, 2).is_ok());
        assert!(source.fetch(2, 2).is_err());
    }

    #[test]
    fn test_memory_lob_reopens_from_start() {
        let lob = MemoryLob::new(b"payload".to_vec());
        for _ in 0..2 {
            let mut reader = lob.open().unwrap();
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).unwrap();
            assert_eq!(buf, b"payload");
        }
        assert_eq!(lob.size_hint(), Some(7));
    }
}
