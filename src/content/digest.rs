//! Content digest computation
//!
//! The digest algorithm is an explicit configuration value handed to the
//! materializer at construction; there is no process-wide default. Digest
//! output is the lowercase hex rendering of the hash over the exact content
//! bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Selectable digest algorithms for content checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

/// Incremental digest accumulator over one content stream.
pub enum ContentDigest {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl ContentDigest {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => ContentDigest::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => ContentDigest::Sha512(Sha512::new()),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            ContentDigest::Sha256(h) => h.update(bytes),
            ContentDigest::Sha512(h) => h.update(bytes),
        }
    }

    /// Consume the accumulator and return the lowercase hex digest.
    pub fn finalize(self) -> String {
        match self {
            ContentDigest::Sha256(h) => format!("{:x}", h.finalize()),
            ContentDigest::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// One-shot digest over a complete byte slice.
pub fn digest_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> String {
    let mut digest = ContentDigest::new(algorithm);
    digest.update(bytes);
    digest.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let a = digest_bytes(DigestAlgorithm::Sha256, b"content");
        let b = digest_bytes(DigestAlgorithm::Sha256, b"content");
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        let hex = digest_bytes(DigestAlgorithm::Sha256, b"abc");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut digest = ContentDigest::new(DigestAlgorithm::Sha512);
        digest.update(b"hello ");
        digest.update(b"world");
        assert_eq!(
            digest.finalize(),
            digest_bytes(DigestAlgorithm::Sha512, b"hello world")
        );
    }

    #[test]
    fn test_algorithms_differ() {
        assert_ne!(
            digest_bytes(DigestAlgorithm::Sha256, b"x"),
            digest_bytes(DigestAlgorithm::Sha512, b"x")
        );
    }
}
