//! iCalendar date, date-time and duration values
//!
//! Output instants are ISO-8601 in UTC with a `Z` suffix. Values with an
//! unknown shape are passed through unchanged so the caller still sees them.

use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use regex::Regex;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Infallible with a valid static pattern
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Failed to compile duration pattern")
});

/// Convert a DTSTART/DTEND value to ISO-8601 UTC
///
/// - `YYYYMMDD` is local midnight
/// - `YYYYMMDDThhmmssZ` is UTC
/// - `YYYYMMDDThhmmss` is local wall-clock time
///
/// Anything else, including local times that fall into a DST gap, is
/// returned as-is.
///
/// ```
/// use integration_ics::datetime::normalize_timestamp;
///
/// assert_eq!(normalize_timestamp("20260105T081500Z"), "2026-01-05T08:15:00Z");
/// assert_eq!(normalize_timestamp("next tuesday"), "next tuesday");
/// ```
pub fn normalize_timestamp(value: &str) -> String {
    let value = value.trim();
    parse_timestamp(value).map_or_else(|| value.to_string(), format_utc)
}

/// Parse a DTSTART/DTEND value into a UTC instant
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if !value.is_ascii() {
        return None;
    }

    match value.len() {
        8 => {
            let date = parse_date(value)?;
            local_to_utc(date.and_time(NaiveTime::MIN))
        },
        15 | 16 => {
            let (date_part, rest) = value.split_at(8);
            let time_part = rest.strip_prefix('T')?;
            let (time_part, utc) = match time_part.strip_suffix('Z') {
                Some(t) => (t, true),
                None => (time_part, false),
            };
            if time_part.len() != 6 {
                return None;
            }
            let naive = NaiveDateTime::new(parse_date(date_part)?, parse_time(time_part)?);
            if utc {
                Some(Utc.from_utc_datetime(&naive))
            } else {
                local_to_utc(naive)
            }
        },
        _ => None,
    }
}

/// Parse a `P[nW][nD][T[nH][nM][nS]]` duration
///
/// Returns `None` for malformed values and for `P`/`PT` with no component.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let caps = DURATION_PATTERN.captures(value.trim())?;

    let mut any = false;
    let mut component = |index: usize| -> Option<i64> {
        caps.get(index).map_or(Some(0), |m| {
            any = true;
            m.as_str().parse::<i64>().ok()
        })
    };

    let weeks = component(1)?;
    let days = component(2)?;
    let hours = component(3)?;
    let minutes = component(4)?;
    let seconds = component(5)?;

    if !any {
        return None;
    }

    Duration::try_weeks(weeks)?
        .checked_add(&Duration::try_days(days)?)?
        .checked_add(&Duration::try_hours(hours)?)?
        .checked_add(&Duration::try_minutes(minutes)?)?
        .checked_add(&Duration::try_seconds(seconds)?)
}

/// Add a duration to a normalized start, if the start is an ISO-8601 instant
pub fn add_duration(start: &str, duration: Duration) -> Option<String> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = start.with_timezone(&Utc).checked_add_signed(duration)?;
    Some(format_utc(end))
}

/// Render an instant the way decoded events carry it
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H%M%S").ok()
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
