//! Document identity encoding
//!
//! A DocumentId is derived deterministically from a row's primary-key values:
//! each configured key is resolved against the row's actual column names
//! (case-insensitively, first match wins), the resolved values are rendered
//! as text and joined with a fixed delimiter in configured key order, and the
//! whole string is encoded with URL-safe base64 (no padding).
//!
//! The encoding is reversible for debugging and authorization lookups, but
//! decoding does not recover field boundaries when a key value itself
//! contains the delimiter. Whole-id determinism is the only guarantee;
//! delimiter collisions are a documented correctness risk (two distinct
//! tuples such as ("a,b") and ("a","b") encode identically).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use crate::source::Row;

/// Delimiter joining rendered primary-key values before encoding.
pub const KEY_DELIMITER: char = ',';

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity errors are per-row: the row is skipped and counted, the scan
/// continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The row had no columns at all
    #[error("Cannot derive document id from an empty row")]
    EmptyRow,

    /// No primary-key columns were configured
    #[error("Primary key specification is empty")]
    EmptyKeySpec,

    /// A configured key matched none of the row's columns
    #[error("Primary key column '{0}' not found in row")]
    UnresolvedKey(String),

    /// A document id could not be decoded back to text
    #[error("Document id is not valid url-safe base64: {0}")]
    MalformedId(String),
}

/// Ordered list of logical primary-key column names.
///
/// Logical names are resolved against a row's actual column names at
/// encoding time, so the spec survives sources that report different casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeySpec {
    keys: Vec<String>,
}

impl PrimaryKeySpec {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Stable identity of one document, derived from primary-key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an already-encoded id, e.g. one read back from a snapshot file.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the DocumentId for a row.
///
/// Fails when the row is empty, the key spec is empty, or any configured key
/// fails to resolve. A resolved key whose value is NULL contributes an empty
/// rendering; a trailing delimiter from a NULL final key is dropped so ids
/// stay stable whether or not the last key column is populated.
pub fn encode(spec: &PrimaryKeySpec, row: &Row) -> IdentityResult<DocumentId> {
    if row.is_empty() {
        return Err(IdentityError::EmptyRow);
    }
    if spec.is_empty() {
        return Err(IdentityError::EmptyKeySpec);
    }

    let mut joined = String::new();
    let mut last_was_absent = false;

    for (i, key) in spec.keys().iter().enumerate() {
        let actual = row
            .resolve_name(key)
            .ok_or_else(|| IdentityError::UnresolvedKey(key.clone()))?;
        // resolve_name and get use the same first-match rule
        let value = row.get(actual).ok_or_else(|| IdentityError::UnresolvedKey(key.clone()))?;

        if i > 0 {
            joined.push(KEY_DELIMITER);
        }
        match value.render_text() {
            Some(text) => {
                joined.push_str(&text);
                last_was_absent = false;
            }
            None => {
                last_was_absent = true;
            }
        }
    }

    if last_was_absent && joined.ends_with(KEY_DELIMITER) {
        joined.pop();
    }

    Ok(DocumentId(URL_SAFE_NO_PAD.encode(joined.as_bytes())))
}

/// Decode a DocumentId back to the joined key text.
///
/// Debugging aid only: the result is the delimiter-joined rendering, and
/// callers must not assume they can split it back into individual key values.
pub fn decode(id: &DocumentId) -> IdentityResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(id.as_str().as_bytes())
        .map_err(|e| IdentityError::MalformedId(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| IdentityError::MalformedId(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Value;

    fn spec(keys: &[&str]) -> PrimaryKeySpec {
        PrimaryKeySpec::new(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn test_encode_known_tuple() {
        let row = Row::new()
            .with("id", Value::Text("1".into()))
            .with("lastName", Value::Text("last_01".into()));
        let id = encode(&spec(&["id", "lastName"]), &row).unwrap();

        assert_eq!(id.as_str(), URL_SAFE_NO_PAD.encode("1,last_01"));
        assert_eq!(decode(&id).unwrap(), "1,last_01");
    }

    #[test]
    fn test_encode_is_deterministic_across_extra_columns() {
        let a = Row::new()
            .with("id", Value::Integer(1))
            .with("lastName", Value::Text("last_01".into()));
        let b = Row::new()
            .with("other", Value::Text("noise".into()))
            .with("lastName", Value::Text("last_01".into()))
            .with("id", Value::Integer(1));

        let s = spec(&["id", "lastName"]);
        assert_eq!(encode(&s, &a).unwrap(), encode(&s, &b).unwrap());
    }

    #[test]
    fn test_encode_resolves_keys_case_insensitively() {
        let row = Row::new()
            .with("ID", Value::Integer(9))
            .with("LASTNAME", Value::Text("x".into()));
        let id = encode(&spec(&["id", "lastname"]), &row).unwrap();
        assert_eq!(decode(&id).unwrap(), "9,x");
    }

    #[test]
    fn test_encode_reencode_roundtrip() {
        let row = Row::new()
            .with("id", Value::Integer(3))
            .with("name", Value::Text("n".into()));
        let s = spec(&["id", "name"]);
        let first = encode(&s, &row).unwrap();
        let second = encode(&s, &row).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_row_fails() {
        assert_eq!(
            encode(&spec(&["id"]), &Row::new()),
            Err(IdentityError::EmptyRow)
        );
    }

    #[test]
    fn test_empty_spec_fails() {
        let row = Row::new().with("id", Value::Integer(1));
        assert_eq!(encode(&spec(&[]), &row), Err(IdentityError::EmptyKeySpec));
    }

    #[test]
    fn test_unresolved_key_fails() {
        let row = Row::new().with("id", Value::Integer(1));
        assert_eq!(
            encode(&spec(&["id", "missing"]), &row),
            Err(IdentityError::UnresolvedKey("missing".to_string()))
        );
    }

    #[test]
    fn test_trailing_null_key_drops_delimiter() {
        let populated = Row::new()
            .with("id", Value::Integer(1))
            .with("suffix", Value::Null);
        let id = encode(&spec(&["id", "suffix"]), &populated).unwrap();
        assert_eq!(decode(&id).unwrap(), "1");
    }

    #[test]
    fn test_delimiter_collision_is_a_known_risk() {
        // ("a,b") as one key and ("a","b") as two keys produce the same id.
        // Documented limitation of the joined-text encoding.
        let single = Row::new().with("k1", Value::Text("a,b".into()));
        let double = Row::new()
            .with("k1", Value::Text("a".into()))
            .with("k2", Value::Text("b".into()));

        let one = encode(&spec(&["k1"]), &single).unwrap();
        let two = encode(&spec(&["k1", "k2"]), &double).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let bad = DocumentId::from_encoded("not!valid!base64!");
        assert!(matches!(decode(&bad), Err(IdentityError::MalformedId(_))));
    }
}
