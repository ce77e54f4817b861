//! Calendar event entity
//!
//! Events are produced fresh by every decode call. Their `id` is derived from
//! the content, so the same export always yields the same ids and a UI can
//! use them as stable keys across reloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single decoded schedule entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Content fingerprint of `(summary, start, end, location)`
    pub id: String,
    /// Event title
    pub summary: String,
    /// Start as ISO-8601 (UTC), or the raw source value if it had an unknown shape
    pub start: String,
    /// End as ISO-8601 (UTC); may precede `start` if the source says so
    pub end: String,
    /// Room or place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category labels in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl CalendarEvent {
    /// Create an event, deriving its id from the identifying fields
    pub fn new(
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        let summary = summary.into();
        let start = start.into();
        let end = end.into();
        let id = fingerprint(&summary, &start, &end, location.as_deref());
        Self {
            id,
            summary,
            start,
            end,
            location,
            description: None,
            categories: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the categories
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Parsed start instant, if `start` is ISO-8601
    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.start)
    }

    /// Parsed end instant, if `end` is ISO-8601
    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.end)
    }

    /// Length of the event when both ends parse
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_instant()? - self.start_instant()?)
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deterministic fingerprint of an event's identifying fields
///
/// 32-bit multiply-by-31-and-add over the UTF-16 code units of
/// `summary|start|end|location`, rendered as 8 hex digits.
///
/// # Examples
///
/// ```
/// use domain::fingerprint;
///
/// let a = fingerprint("Lecture", "2026-01-05T08:00:00Z", "2026-01-05T09:30:00Z", Some("A1"));
/// let b = fingerprint("Lecture", "2026-01-05T08:00:00Z", "2026-01-05T09:30:00Z", Some("A1"));
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 8);
/// ```
pub fn fingerprint(summary: &str, start: &str, end: &str, location: Option<&str>) -> String {
    let key = format!("{summary}|{start}|{end}|{}", location.unwrap_or_default());
    let hash = key
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)));
    format!("{hash:08x}")
}
