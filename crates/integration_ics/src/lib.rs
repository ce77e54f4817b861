#![forbid(unsafe_code)]
//! iCalendar export handling for schedsync
//!
//! Three pure, I/O-free stages turn portal export bytes into events:
//!
//! 1. [`looks_like_calendar`] classifies a byte buffer (BOM-aware).
//! 2. [`decode_calendar_bytes`] picks a text encoding and decodes to UTF-8.
//! 3. [`decode`] parses VEVENT blocks into sorted [`CalendarEvent`]s.
//!
//! # Example
//!
//! ```
//! let bytes = b"BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Lecture\r\nDTSTART:20260105T081500Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! assert!(integration_ics::looks_like_calendar(bytes));
//!
//! let events = integration_ics::decode_bytes(bytes);
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].start, "2026-01-05T08:15:00Z");
//! ```

pub mod datetime;
mod encoding;
mod parser;
mod sniffer;

pub use domain::CalendarEvent;
pub use encoding::{DecodedText, TextEncoding, decode_calendar_bytes};
pub use parser::{decode, unfold};
pub use sniffer::looks_like_calendar;

/// Decode raw export bytes straight into events
pub fn decode_bytes(bytes: &[u8]) -> Vec<CalendarEvent> {
    decode(&decode_calendar_bytes(bytes).text)
}
