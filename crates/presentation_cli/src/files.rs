//! Inspection of exports saved on disk

use std::{fmt, fs, io, path::Path};

use domain::CalendarEvent;
use integration_ics::{TextEncoding, decode, decode_calendar_bytes, looks_like_calendar};

/// Result of sniffing a local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffReport {
    pub size: usize,
    pub is_calendar: bool,
    pub encoding: TextEncoding,
}

impl fmt::Display for SniffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_calendar {
            "calendar data"
        } else {
            "not calendar data"
        };
        write!(f, "{verdict} ({} bytes, {})", self.size, self.encoding)
    }
}

/// Events decoded from a local file
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub encoding: TextEncoding,
    pub events: Vec<CalendarEvent>,
}

/// Sniff in-memory bytes
pub fn sniff_bytes(bytes: &[u8]) -> SniffReport {
    SniffReport {
        size: bytes.len(),
        is_calendar: looks_like_calendar(bytes),
        encoding: decode_calendar_bytes(bytes).encoding,
    }
}

/// Sniff a file
pub fn sniff_file(path: &Path) -> io::Result<SniffReport> {
    fs::read(path).map(|bytes| sniff_bytes(&bytes))
}

/// Decode a file into events
pub fn decode_file(path: &Path) -> io::Result<DecodeReport> {
    let bytes = fs::read(path)?;
    let text = decode_calendar_bytes(&bytes);
    Ok(DecodeReport {
        encoding: text.encoding,
        events: decode(&text.text),
    })
}
