//! Feed configuration
//!
//! Loaded from a JSON file (`tablefeed.json` by default). One config file
//! describes one data source: where state lives, how identity is derived,
//! which builder variant runs, and the materialization bounds.
//!
//! ```json
//! {
//!   "data_dir": "./feed-data",
//!   "primary_key": ["id", "last_name"],
//!   "builder": "metadata_only",
//!   "digest": "sha256",
//!   "batch_size": 500,
//!   "chunk_size": 65536,
//!   "spill_threshold": 1048576,
//!   "source": {
//!     "columns": [{"name": "id", "kind": "character"}],
//!     "rows": [{"id": "1"}]
//!   }
//! }
//! ```
//!
//! The inline source block is optional; library embedders supply their own
//! row source and leave it out.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::DigestAlgorithm;
use crate::document::{BuilderConfig, BuilderVariant};
use crate::identity::PrimaryKeySpec;
use crate::source::{ColumnKind, ColumnMeta, MemorySource, Row, Value};

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_batch_size() -> usize {
    500
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_spill_threshold() -> u64 {
    1024 * 1024
}

/// Declared kind of an inline source column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigColumnKind {
    Character,
    Binary,
    LargeCharacter,
    LargeBinary,
}

impl From<ConfigColumnKind> for ColumnKind {
    fn from(kind: ConfigColumnKind) -> Self {
        match kind {
            ConfigColumnKind::Character => ColumnKind::Character,
            ConfigColumnKind::Binary => ColumnKind::Binary,
            ConfigColumnKind::LargeCharacter => ColumnKind::LargeCharacter,
            ConfigColumnKind::LargeBinary => ColumnKind::LargeBinary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigColumn {
    pub name: String,
    pub kind: ConfigColumnKind,
}

/// Inline row set shipped in the config file, for small sources and the
/// status/demo commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineSource {
    pub columns: Vec<ConfigColumn>,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Top-level feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Directory holding snapshot, checkpoint marker, and spool files
    pub data_dir: PathBuf,

    /// Ordered primary-key column names
    pub primary_key: Vec<String>,

    /// Builder variant for this source
    pub builder: BuilderVariant,

    /// Content column (required for the content variant)
    #[serde(default)]
    pub content_column: Option<String>,

    /// Reference column (required for the external_reference variant)
    #[serde(default)]
    pub url_column: Option<String>,

    /// Column carrying the last-modified timestamp
    #[serde(default)]
    pub date_column: Option<String>,

    /// Static visibility flag stamped on documents
    #[serde(default)]
    pub is_public: Option<bool>,

    /// Content digest algorithm
    #[serde(default)]
    pub digest: DigestAlgorithm,

    /// Rows fetched per source batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Read chunk size for large-object streaming
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bytes buffered in memory before content spills to disk
    #[serde(default = "default_spill_threshold")]
    pub spill_threshold: u64,

    /// Optional inline row source
    #[serde(default)]
    pub source: Option<InlineSource>,
}

impl FeedConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: FeedConfig = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.primary_key.is_empty() {
            return Err(ConfigError::Invalid(
                "primary_key must name at least one column".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        match self.builder {
            BuilderVariant::Content if self.content_column.is_none() => Err(ConfigError::Invalid(
                "content builder requires content_column".to_string(),
            )),
            BuilderVariant::ExternalReference if self.url_column.is_none() => {
                Err(ConfigError::Invalid(
                    "external_reference builder requires url_column".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// The builder configuration this config describes.
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            variant: self.builder,
            primary_key: PrimaryKeySpec::new(self.primary_key.clone()),
            content_column: self.content_column.clone(),
            url_column: self.url_column.clone(),
            date_column: self.date_column.clone(),
            is_public: self.is_public,
        }
    }

    /// Spool directory for spilled content.
    pub fn spool_dir(&self) -> PathBuf {
        self.data_dir.join("spool")
    }

    /// Build an in-memory source from the inline block.
    pub fn inline_source(&self) -> ConfigResult<MemorySource> {
        let inline = self.source.as_ref().ok_or_else(|| {
            ConfigError::Invalid("config has no inline source block".to_string())
        })?;

        let columns: Vec<ColumnMeta> = inline
            .columns
            .iter()
            .map(|c| ColumnMeta::new(c.name.clone(), c.kind.into()))
            .collect();

        let rows = inline
            .rows
            .iter()
            .map(|object| {
                let mut row = Row::new();
                // JSON objects sort keys, so inline row column order is
                // alphabetical; identity ordering comes from primary_key
                for (name, value) in object {
                    row.push(name.clone(), json_to_value(value));
                }
                row
            })
            .collect();

        Ok(MemorySource::new(columns, rows))
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal_json() -> String {
        r#"{
            "data_dir": "./feed-data",
            "primary_key": ["id"],
            "builder": "metadata_only"
        }"#
        .to_string()
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tablefeed.json");
        fs::write(&path, minimal_json()).unwrap();

        let config = FeedConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_empty_primary_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tablefeed.json");
        fs::write(
            &path,
            r#"{"data_dir": ".", "primary_key": [], "builder": "metadata_only"}"#,
        )
        .unwrap();
        assert!(matches!(
            FeedConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_content_builder_requires_content_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tablefeed.json");
        fs::write(
            &path,
            r#"{"data_dir": ".", "primary_key": ["id"], "builder": "content"}"#,
        )
        .unwrap();
        assert!(matches!(
            FeedConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_inline_source_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tablefeed.json");
        fs::write(
            &path,
            r#"{
                "data_dir": ".",
                "primary_key": ["id"],
                "builder": "metadata_only",
                "source": {
                    "columns": [
                        {"name": "id", "kind": "character"},
                        {"name": "name", "kind": "character"}
                    ],
                    "rows": [
                        {"id": 1, "name": "alpha"},
                        {"id": 2, "name": null}
                    ]
                }
            }"#,
        )
        .unwrap();

        let config = FeedConfig::load(&path).unwrap();
        let mut source = config.inline_source().unwrap();
        use crate::source::RowSource;
        let rows = source.fetch(0, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0].get("id"), Some(Value::Integer(1))));
        assert!(matches!(rows[1].get("name"), Some(Value::Null)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(
            FeedConfig::load(&path),
            Err(ConfigError::Read { .. })
        ));
    }
}
