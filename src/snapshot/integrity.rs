//! CRC32 integrity checksums for persisted feed state
//!
//! The snapshot file embeds a CRC32 (IEEE polynomial) over its serialized
//! entry payload, verified on every load. A mismatch means the file was
//! truncated or corrupted and the previous committed state must be treated
//! as lost, never silently trusted.
//!
//! Formatted as "crc32:XXXXXXXX" (lowercase hex, zero padded).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
///
/// Deterministic: the same input always produces the same output.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Formats a checksum as "crc32:XXXXXXXX".
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses a "crc32:XXXXXXXX" string back to its value.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let hex = formatted.strip_prefix("crc32:")?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Verifies that data matches a formatted checksum string.
pub fn verify_checksum(data: &[u8], formatted: &str) -> bool {
    match parse_checksum(formatted) {
        Some(expected) => compute_checksum(data) == expected,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"snapshot entry payload";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_format_parse_roundtrip() {
        let checksum = compute_checksum(b"abc");
        let formatted = format_checksum(checksum);
        assert!(formatted.starts_with("crc32:"));
        assert_eq!(parse_checksum(&formatted), Some(checksum));
    }

    #[test]
    fn test_verify_detects_corruption() {
        let formatted = format_checksum(compute_checksum(b"original"));
        assert!(verify_checksum(b"original", &formatted));
        assert!(!verify_checksum(b"tampered", &formatted));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_checksum("md5:00000000"), None);
        assert_eq!(parse_checksum("crc32:xyz"), None);
        assert_eq!(parse_checksum("crc32:0000"), None);
    }
}
