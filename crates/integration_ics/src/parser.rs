//! VEVENT decoding
//!
//! A line-oriented reader over unfolded iCalendar text. It only understands
//! the handful of properties a schedule view needs and silently skips the
//! rest, including everything inside nested components such as VALARM.

use domain::CalendarEvent;
use tracing::debug;

use crate::datetime::{add_duration, normalize_timestamp, parse_duration};

/// Decode calendar text into events sorted by start
///
/// Malformed lines are ignored and events without a summary or start are
/// dropped. Empty input yields an empty list.
pub fn decode(text: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut current: Option<EventBuilder> = None;
    let mut nested_depth = 0usize;
    let mut dropped = 0usize;

    for line in unfold(text) {
        let Some((name, value)) = split_property(&line) else {
            continue;
        };

        match name.as_str() {
            "BEGIN" => {
                if value.trim().eq_ignore_ascii_case("VEVENT") && current.is_none() {
                    current = Some(EventBuilder::default());
                    nested_depth = 0;
                } else if current.is_some() {
                    nested_depth += 1;
                }
            },
            "END" => {
                if current.is_none() {
                    continue;
                }
                if nested_depth > 0 {
                    nested_depth -= 1;
                } else if value.trim().eq_ignore_ascii_case("VEVENT") {
                    if let Some(event) = current.take().and_then(EventBuilder::build) {
                        events.push(event);
                    } else {
                        dropped += 1;
                    }
                }
            },
            _ if nested_depth == 0 => {
                if let Some(builder) = current.as_mut() {
                    builder.apply(&name, value);
                }
            },
            _ => {},
        }
    }

    events.sort_by(|a, b| a.start.cmp(&b.start));

    debug!(events = events.len(), dropped, "Decoded calendar text");
    events
}

/// Normalize line endings and join continuation lines
///
/// A line starting with a space or tab continues the previous line; the
/// single leading whitespace character is removed.
///
/// ```
/// let lines = integration_ics::unfold("SUMMARY:Foo\n Bar\nLOCATION:A");
/// assert_eq!(lines, vec!["SUMMARY:FooBar", "LOCATION:A"]);
/// ```
pub fn unfold(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();

    for raw in normalized.split('\n') {
        if let Some(continuation) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(continuation);
            }
            continue;
        }
        if !raw.is_empty() {
            lines.push(raw.to_string());
        }
    }

    lines
}

/// Split `NAME;PARAM=..:value` into an upper-cased name and the raw value
fn split_property(line: &str) -> Option<(String, &str)> {
    let mut in_quotes = false;
    let mut colon = None;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(index);
                break;
            },
            _ => {},
        }
    }

    let colon = colon?;
    let head = &line[..colon];
    let name = head.split(';').next().unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_uppercase(), &line[colon + 1..]))
}

/// Resolve `\n`, `\N`, `\,`, `\;` and `\\`; unknown escapes keep the backslash
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(escaped @ (',' | ';' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}

/// Split a CATEGORIES value on commas that are not escaped
fn split_categories(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            ',' => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .iter()
        .map(|part| unescape(part).trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

#[derive(Debug, Default)]
struct EventBuilder {
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    categories: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    duration: Option<chrono::Duration>,
}

impl EventBuilder {
    fn apply(&mut self, name: &str, value: &str) {
        match name {
            "SUMMARY" => self.summary = Some(unescape(value).trim().to_string()),
            "DESCRIPTION" => self.description = non_empty(unescape(value)),
            "LOCATION" => self.location = non_empty(unescape(value).trim().to_string()),
            "CATEGORIES" => self.categories.extend(split_categories(value)),
            "DTSTART" => self.start = Some(normalize_timestamp(value)),
            "DTEND" => self.end = Some(normalize_timestamp(value)),
            "DURATION" => self.duration = parse_duration(value),
            _ => {},
        }
    }

    fn build(self) -> Option<CalendarEvent> {
        let summary = self.summary.filter(|s| !s.is_empty())?;
        let start = self.start.filter(|s| !s.is_empty())?;
        let end = self
            .end
            .filter(|e| !e.is_empty())
            .or_else(|| self.duration.and_then(|d| add_duration(&start, d)))
            .unwrap_or_else(|| start.clone());

        let mut event =
            CalendarEvent::new(summary, start, end, self.location).with_categories(self.categories);
        if let Some(description) = self.description {
            event = event.with_description(description);
        }
        Some(event)
    }
}
