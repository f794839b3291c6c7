//! Bounded mime-type sniffing
//!
//! Mime type is inferred from a fixed-size sample of the payload head, never
//! the whole value, so sniffing stays memory-bounded on very large objects.

/// Bytes of payload head the sniffer inspects.
pub const SNIFF_SAMPLE_LEN: usize = 512;

const MAGIC_TABLE: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"<?xml", "application/xml"),
];

/// Infer a mime type from the first bytes of a payload.
///
/// `sample` must be at most the payload head (callers pass up to
/// `SNIFF_SAMPLE_LEN` bytes). Unrecognized content falls back to text/plain
/// when the sample is valid UTF-8 without NUL bytes, octet-stream otherwise.
pub fn sniff_mime_type(sample: &[u8]) -> &'static str {
    if sample.is_empty() {
        return "application/octet-stream";
    }

    for (magic, mime) in MAGIC_TABLE {
        if sample.starts_with(magic) {
            return mime;
        }
    }

    if !sample.contains(&0) && std::str::from_utf8(sample).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_known_magics() {
        assert_eq!(sniff_mime_type(b"%PDF-1.7 rest"), "application/pdf");
        assert_eq!(sniff_mime_type(b"\x89PNG\r\n\x1a\nchunk"), "image/png");
        assert_eq!(sniff_mime_type(b"PK\x03\x04zipdata"), "application/zip");
    }

    #[test]
    fn test_sniff_text_fallback() {
        assert_eq!(sniff_mime_type(b"plain old text"), "text/plain");
    }

    #[test]
    fn test_sniff_binary_fallback() {
        assert_eq!(
            sniff_mime_type(&[0x00, 0x01, 0x02, 0xff]),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_sniff_empty_is_octet_stream() {
        assert_eq!(sniff_mime_type(b""), "application/octet-stream");
    }
}
