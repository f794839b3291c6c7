//! Row source contract and row/value model
//!
//! A row source yields an ordered, paginated sequence of rows. The feed
//! engine drives it with monotonically increasing offsets within one scan;
//! a short or empty batch signals end of data.
//!
//! Column metadata (name and data kind) is fetched once per scan, not per
//! row, because the lookup is comparatively expensive on real sources and
//! stable across rows of the same query.

mod memory;

pub use memory::{MemoryLob, MemorySource};

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use thiserror::Error;

/// Result type for row source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised by a row source.
///
/// Source errors are fatal to the current scan: the engine aborts and leaves
/// the persisted snapshot untouched.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not produce a batch
    #[error("Failed to fetch batch at offset {offset}: {message}")]
    FetchFailed { offset: u64, message: String },

    /// Column metadata lookup failed
    #[error("Failed to read column metadata: {0}")]
    MetadataFailed(String),

    /// Underlying I/O failure
    #[error("Source I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The data kind a column was declared with.
///
/// Strategy selection in the materializer keys off this; it is a closed set,
/// resolved once per column and cached for the whole scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Inline text (VARCHAR and friends)
    Character,
    /// Inline raw bytes (VARBINARY and friends)
    Binary,
    /// Large text object, read incrementally (CLOB)
    LargeCharacter,
    /// Large binary object, read incrementally (BLOB)
    LargeBinary,
}

/// Declared metadata for one column of the scanned query.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    /// Column name as the source reports it
    pub name: String,
    /// Declared data kind
    pub kind: ColumnKind,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Handle to a large object that supports incremental reads.
///
/// The handle itself is cheap; `open` returns a fresh reader over the full
/// value. The materializer consumes the reader chunk-wise so the whole value
/// is never resident at once.
pub trait LobSource: Send + Sync {
    /// Open a reader positioned at the start of the value.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Total size in bytes, when the source knows it.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// One column value of one row.
#[derive(Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Bytes(Vec<u8>),
    /// Reference to a large text object
    LargeText(Arc<dyn LobSource>),
    /// Reference to a large binary object
    LargeBytes(Arc<dyn LobSource>),
}

impl Value {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual rendering used for identity encoding and metadata properties.
    ///
    /// NULL renders as `None`; large objects render as `None` as well, since
    /// they are never legal identity or metadata inputs.
    pub fn render_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
            Value::Bytes(v) => Some(format!("{} bytes", v.len())),
            Value::LargeText(_) | Value::LargeBytes(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Integer(v) => write!(f, "Integer({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Boolean(v) => write!(f, "Boolean({})", v),
            Value::Text(v) => write!(f, "Text({:?})", v),
            Value::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Value::LargeText(_) => write!(f, "LargeText(..)"),
            Value::LargeBytes(_) => write!(f, "LargeBytes(..)"),
        }
    }
}

/// One row: an ordered mapping of column name to value.
///
/// Rows are transient; the engine produces and discards them per batch.
/// Column lookup by configured name is case-insensitive, first match wins.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Builder-style column append, preserving insertion order.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.columns.push((name.into(), value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Ordered iteration over (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Case-insensitive lookup; the first matching column wins.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Resolve a configured logical name to the actual column name.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, _)| n.as_str())
    }
}

/// Ordered, paginated row producer.
///
/// Offsets are monotonically increasing within one scan. A batch shorter
/// than `limit` (including an empty one) signals end of data.
pub trait RowSource {
    /// Column metadata for the scanned query. Called once per scan.
    fn columns(&mut self) -> SourceResult<Vec<ColumnMeta>>;

    /// Fetch up to `limit` rows starting at `offset`.
    fn fetch(&mut self, offset: u64, limit: usize) -> SourceResult<Vec<Row>>;
}
