//! Document delivery sinks
//!
//! The sink is the downstream consumer boundary. Delivery is synchronous:
//! a sink returning `Ok` has accepted and acknowledged the document, and the
//! checkpoint may advance past it.

use std::io::Write;

use crate::document::Document;

use super::errors::SinkError;

/// Downstream consumer of delivered documents.
pub trait DocumentSink {
    fn deliver(&mut self, document: &Document) -> Result<(), SinkError>;
}

/// Writes each delivered document as one JSON line.
///
/// The wire form per line is the delivered-document format; this is what the
/// CLI emits to stdout or a feed file. Spilled payloads stream through a
/// base64 encoder into the line, so delivery memory stays bounded no matter
/// how large the payload grew.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocumentSink for JsonLinesSink<W> {
    fn deliver(&mut self, document: &Document) -> Result<(), SinkError> {
        document.write_wire_line(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::identity::DocumentId;

    #[test]
    fn test_json_lines_sink_emits_one_line_per_document() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.deliver(&Document::delete(DocumentId::from_encoded("a")))
            .unwrap();
        sink.deliver(&Document::delete(DocumentId::from_encoded("b")))
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["doc_id"], "a");
        assert_eq!(first["action"], "delete");
    }
}
