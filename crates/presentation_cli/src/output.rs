//! Event rendering for terminal and machine output

use std::fmt::Write as _;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Local};
use domain::CalendarEvent;

const SUMMARY_WIDTH: usize = 40;

/// Human-readable local time, or the raw value if it is not ISO-8601
fn local_time(raw: &str, instant: Option<DateTime<chrono::Utc>>) -> String {
    instant.map_or_else(
        || raw.to_string(),
        |t| t.with_timezone(&Local).format("%a %d.%m.%Y %H:%M").to_string(),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render events as a fixed-width table, one line per event
pub fn render_table(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return "No events.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20}  {:<20}  {:<SUMMARY_WIDTH$}  LOCATION",
        "START", "END", "SUMMARY"
    );
    for event in events {
        let _ = writeln!(
            out,
            "{:<20}  {:<20}  {:<SUMMARY_WIDTH$}  {}",
            local_time(&event.start, event.start_instant()),
            local_time(&event.end, event.end_instant()),
            truncate(&event.summary, SUMMARY_WIDTH),
            event.location.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(out, "\n{} event(s)", events.len());
    out
}

/// Render events as pretty-printed JSON
pub fn render_json(events: &[CalendarEvent]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(events)
}

/// Raw export bytes, optionally base64-encoded
pub fn raw_output(bytes: &[u8], base64: bool) -> Vec<u8> {
    if base64 {
        let mut encoded = STANDARD.encode(bytes).into_bytes();
        encoded.push(b'\n');
        encoded
    } else {
        bytes.to_vec()
    }
}
