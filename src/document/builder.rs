//! Document builder variants
//!
//! Three variants share the `build(row)` contract and differ only in what
//! "content" means:
//!
//! - `Content`: a configured large-object column is the document content;
//!   every other column becomes a metadata property.
//! - `MetadataOnly`: no content column; a deterministic JSON rendering of
//!   the whole row stands in as content, driving change detection and giving
//!   operators something readable.
//! - `ExternalReference`: content stays where it is; a URL column is
//!   surfaced as a property for on-demand fetch, and the row rendering is
//!   digested for change detection.
//!
//! Variant selection is a static configuration decision per source, never
//! per row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Map;

use crate::content::{ContentHolder, Materializer};
use crate::identity::{self, PrimaryKeySpec};
use crate::source::{Row, Value};

use super::errors::{BuildError, BuildResult};
use super::{Document, Property};

/// Which content shape the builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderVariant {
    Content,
    MetadataOnly,
    ExternalReference,
}

/// Static per-source builder configuration.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub variant: BuilderVariant,
    pub primary_key: PrimaryKeySpec,
    /// Content column, required for the `Content` variant
    pub content_column: Option<String>,
    /// Reference column, required for the `ExternalReference` variant
    pub url_column: Option<String>,
    /// Column holding the row's last-modified timestamp, if any
    pub date_column: Option<String>,
    /// Static visibility flag stamped onto every document, if configured
    pub is_public: Option<bool>,
}

/// Assembles immutable documents from rows.
pub struct DocumentBuilder {
    config: BuilderConfig,
}

impl DocumentBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn variant(&self) -> BuilderVariant {
        self.config.variant
    }

    /// Build the ADD document for one row.
    ///
    /// Identity failures, materialization failures, and assembly failures
    /// all come back as a classified `RowError`; the caller skips the row.
    pub fn build(&self, row: &Row, materializer: &mut Materializer) -> BuildResult<Document> {
        let id = identity::encode(&self.config.primary_key, row)?;

        let (content, extra_property) = match self.config.variant {
            BuilderVariant::Content => {
                let column = self.config.content_column.as_deref().unwrap_or_default();
                (materializer.materialize(row, column)?, None)
            }
            BuilderVariant::MetadataOnly => {
                let rendering = render_row(row)?;
                (
                    materializer.materialize_text(&rendering, "application/json"),
                    None,
                )
            }
            BuilderVariant::ExternalReference => {
                let column = self.config.url_column.as_deref().unwrap_or_default();
                let reference = row
                    .get(column)
                    .and_then(Value::render_text)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| BuildError::MissingReference(column.to_string()))?;
                // Digest the row rendering so content changes at the source
                // still flip the checksum
                let rendering = render_row(row)?;
                (
                    materializer.materialize_text(&rendering, "application/json"),
                    Some(Property::single("url", reference)),
                )
            }
        };

        let checksum = content.checksum();
        let mime_type = content.mime_type().to_string();
        let last_modified = self.resolve_last_modified(row);
        let properties = self.collect_properties(row, extra_property);

        // External references never embed the payload
        let embedded: Option<ContentHolder> = match self.config.variant {
            BuilderVariant::ExternalReference => None,
            _ => Some(content),
        };

        Ok(Document::new_add(
            id,
            checksum,
            Some(mime_type),
            last_modified,
            self.config.is_public,
            properties,
            embedded,
        ))
    }

    /// Metadata properties in row order. The column the variant consumes is
    /// excluded: the content column is the payload, the url column already
    /// surfaces as the synthetic `url` property.
    fn collect_properties(&self, row: &Row, extra: Option<Property>) -> Vec<Property> {
        let skip = match self.config.variant {
            BuilderVariant::Content => self.config.content_column.as_deref(),
            BuilderVariant::ExternalReference => self.config.url_column.as_deref(),
            BuilderVariant::MetadataOnly => None,
        };

        let mut properties = Vec::with_capacity(row.len() + 1);
        if let Some(prop) = extra {
            properties.push(prop);
        }
        for (name, value) in row.iter() {
            if skip.is_some_and(|s| s.eq_ignore_ascii_case(name)) {
                continue;
            }
            if let Some(text) = value.render_text() {
                properties.push(Property::single(name, text));
            }
        }
        properties
    }

    fn resolve_last_modified(&self, row: &Row) -> Option<DateTime<Utc>> {
        let column = self.config.date_column.as_deref()?;
        let value = row.get(column)?;
        match value {
            Value::Text(text) => parse_timestamp(text),
            // Integer columns hold epoch seconds
            Value::Integer(secs) => Utc.timestamp_opt(*secs, 0).single(),
            _ => None,
        }
    }
}

/// Deterministic JSON rendering of a row: keys sorted (serde_json's default
/// map is ordered by key), values rendered as text, NULL and large-object
/// columns rendered as null.
fn render_row(row: &Row) -> Result<String, BuildError> {
    let mut map = Map::new();
    for (name, value) in row.iter() {
        let rendered = match value.render_text() {
            Some(text) => serde_json::Value::String(text),
            None => serde_json::Value::Null,
        };
        map.insert(name.to_string(), rendered);
    }
    Ok(serde_json::to_string(&serde_json::Value::Object(map))?)
}

/// Parse the configured date column. Unparsable values are treated as
/// absent, never fatal.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
