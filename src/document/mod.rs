//! Document record and wire form
//!
//! A document represents one source row at a point in time. It is immutable
//! once constructed: the builder assembles it, the scan engine delivers it,
//! the checkpoint manager retires it on acknowledgment.
//!
//! The content checksum drives change detection only; it is carried on the
//! record but never serialized into the wire form or the metadata
//! properties.

mod builder;
mod errors;

pub use builder::{BuilderConfig, BuilderVariant, DocumentBuilder};
pub use errors::{BuildError, BuildResult, RowError};

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentHolder;
use crate::identity::DocumentId;

/// What the consumer should do with a delivered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Delete,
}

/// One named metadata property with one or more values, order-preserving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub values: Vec<String>,
}

impl Property {
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// Immutable document record for one row of one scan.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    action: Action,
    checksum: String,
    mime_type: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    is_public: Option<bool>,
    properties: Vec<Property>,
    content: Option<ContentHolder>,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_add(
        id: DocumentId,
        checksum: String,
        mime_type: Option<String>,
        last_modified: Option<DateTime<Utc>>,
        is_public: Option<bool>,
        properties: Vec<Property>,
        content: Option<ContentHolder>,
    ) -> Self {
        Self {
            id,
            action: Action::Add,
            checksum,
            mime_type,
            last_modified,
            is_public,
            properties,
            content,
        }
    }

    /// A bare DELETE record. Identity is primary-key based, so a content
    /// change is always a delete of the old identity followed by an add.
    pub fn delete(id: DocumentId) -> Self {
        Self {
            id,
            action: Action::Delete,
            checksum: String::new(),
            mime_type: None,
            last_modified: None,
            is_public: None,
            properties: Vec::new(),
            content: None,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Change-detection checksum. Internal: never present in the wire form.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn is_public(&self) -> Option<bool> {
        self.is_public
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn content(&self) -> Option<&ContentHolder> {
        self.content.as_ref()
    }

    /// Serialize to the delivered-document wire form with inline content.
    ///
    /// Text payloads are delivered verbatim; binary payloads are base64
    /// encoded and tagged with `content_encoding: "base64"`. A payload that
    /// spilled to disk is never inlined here; [`Document::write_wire_line`]
    /// streams it instead, keeping delivery memory bounded by the spill
    /// threshold.
    pub fn to_wire(&self) -> io::Result<WireDocument> {
        let (content, content_encoding) = match &self.content {
            Some(holder) if !holder.is_spilled() => {
                match String::from_utf8(holder.read_to_vec()?) {
                    Ok(text) if is_text_mime(holder.mime_type()) => (Some(text), None),
                    Ok(text) => (
                        Some(STANDARD.encode(text.as_bytes())),
                        Some("base64".to_string()),
                    ),
                    Err(err) => (
                        Some(STANDARD.encode(err.as_bytes())),
                        Some("base64".to_string()),
                    ),
                }
            }
            _ => (None, None),
        };

        Ok(WireDocument {
            doc_id: self.id.as_str().to_string(),
            action: self.action,
            mime_type: self.mime_type.clone(),
            last_modified: self
                .last_modified
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            content_encoding,
            content,
            is_public: self.is_public,
            properties: self.properties.clone(),
        })
    }

    /// Write the complete wire form as one newline-terminated JSON line.
    ///
    /// Inline payloads follow the [`Document::to_wire`] rules. A spilled
    /// payload is read back in chunks and piped through a base64 encoder
    /// straight into `writer`, so the full payload is never resident:
    /// whatever its mime type, a spilled payload is always delivered base64
    /// encoded with `content_encoding: "base64"`.
    pub fn write_wire_line<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let json = serde_json::to_string(&self.to_wire()?)?;
        match &self.content {
            Some(holder) if holder.is_spilled() => {
                // splice the streamed content in before the closing brace
                writer.write_all(&json.as_bytes()[..json.len() - 1])?;
                writer.write_all(b",\"content_encoding\":\"base64\",\"content\":\"")?;
                let mut encoder = EncoderWriter::new(&mut *writer, &STANDARD);
                io::copy(&mut holder.reader()?, &mut encoder)?;
                encoder.finish()?;
                drop(encoder);
                writer.write_all(b"\"}")?;
            }
            _ => writer.write_all(json.as_bytes())?,
        }
        writer.write_all(b"\n")
    }
}

fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/xml"
}

/// Delivered-document wire form. Field names are stable across versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDocument {
    pub doc_id: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DocumentId;

    #[test]
    fn test_delete_document_is_bare() {
        let doc = Document::delete(DocumentId::from_encoded("abc"));
        assert_eq!(doc.action(), Action::Delete);
        assert!(doc.content().is_none());
        assert!(doc.properties().is_empty());

        let wire = doc.to_wire().unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["action"], "delete");
        assert_eq!(json["doc_id"], "abc");
        assert!(json.get("content").is_none());
        // the change-detection checksum never leaks onto the wire
        assert!(json.get("checksum").is_none());
    }

    #[test]
    fn test_wire_field_names_are_stable() {
        let wire = WireDocument {
            doc_id: "id".into(),
            action: Action::Add,
            mime_type: Some("text/plain".into()),
            last_modified: Some("2026-01-02T03:04:05Z".into()),
            content_encoding: None,
            content: Some("hello".into()),
            is_public: Some(true),
            properties: vec![Property::single("name", "value")],
        };
        let json = serde_json::to_string(&wire).unwrap();
        for field in [
            "\"doc_id\"",
            "\"action\"",
            "\"mime_type\"",
            "\"last_modified\"",
            "\"content\"",
            "\"is_public\"",
            "\"properties\"",
        ] {
            assert!(json.contains(field), "missing {} in {}", field, json);
        }
    }
}
