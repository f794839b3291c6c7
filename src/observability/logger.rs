//! Scan lifecycle event log
//!
//! Every diagnostic the scan engine emits is one of the typed [`ScanEvent`]
//! variants, rendered as a single JSON line on stderr. Stdout belongs to the
//! delivered document stream and never carries diagnostics. Rendering is
//! deterministic: `event` and `severity` lead, the variant fields follow in
//! alphabetical order, counters are bare JSON numbers.

use std::fmt;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Severity attached to each emitted event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One loggable fact about a scan.
#[derive(Debug)]
pub enum ScanEvent<'a> {
    /// A full scan started from scratch
    Started,
    /// An interrupted scan was resumed; `last_acked` is the id delivery
    /// replays up to, or `-` when nothing was acknowledged
    Resumed { last_acked: &'a str },
    /// A row failed identity, materialization or build and was skipped
    RowSkipped { reason: &'a str, error: &'a str },
    /// The scan committed; counters summarize what was delivered
    Committed {
        rows: u64,
        adds: u64,
        deletes: u64,
        unchanged: u64,
        skipped: u64,
        duration_ms: u64,
    },
    /// The scan aborted; the prior snapshot stays authoritative
    Aborted { error: &'a str },
}

/// A rendered field value. Counters stay numeric on the wire.
enum Field<'a> {
    Text(&'a str),
    Count(u64),
}

impl ScanEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::Started => "SCAN_STARTED",
            ScanEvent::Resumed { .. } => "SCAN_RESUMED",
            ScanEvent::RowSkipped { .. } => "ROW_SKIPPED",
            ScanEvent::Committed { .. } => "SCAN_COMMITTED",
            ScanEvent::Aborted { .. } => "SCAN_ABORTED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ScanEvent::Started | ScanEvent::Resumed { .. } | ScanEvent::Committed { .. } => {
                Severity::Info
            }
            ScanEvent::RowSkipped { .. } => Severity::Warn,
            ScanEvent::Aborted { .. } => Severity::Error,
        }
    }

    /// Variant fields in their rendered (alphabetical) order.
    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        match self {
            ScanEvent::Started => Vec::new(),
            ScanEvent::Resumed { last_acked } => vec![("last_acked", Field::Text(last_acked))],
            ScanEvent::RowSkipped { reason, error } => vec![
                ("error", Field::Text(error)),
                ("reason", Field::Text(reason)),
            ],
            ScanEvent::Committed {
                rows,
                adds,
                deletes,
                unchanged,
                skipped,
                duration_ms,
            } => vec![
                ("adds", Field::Count(*adds)),
                ("deletes", Field::Count(*deletes)),
                ("duration_ms", Field::Count(*duration_ms)),
                ("rows", Field::Count(*rows)),
                ("skipped", Field::Count(*skipped)),
                ("unchanged", Field::Count(*unchanged)),
            ],
            ScanEvent::Aborted { error } => vec![("error", Field::Text(error))],
        }
    }
}

/// Emit one event as a JSON line on stderr.
pub fn emit(event: &ScanEvent<'_>) {
    let line = render(event);
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_all(line.as_bytes());
}

fn render(event: &ScanEvent<'_>) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("{\"event\":\"");
    out.push_str(event.name());
    out.push_str("\",\"severity\":\"");
    out.push_str(event.severity().as_str());
    out.push('"');
    for (key, value) in event.fields() {
        out.push_str(",\"");
        out.push_str(key);
        out.push_str("\":");
        match value {
            Field::Count(n) => {
                let _ = write!(out, "{}", n);
            }
            Field::Text(text) => {
                out.push('"');
                escape_into(&mut out, text);
                out.push('"');
            }
        }
    }
    out.push_str("}\n");
    out
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}
