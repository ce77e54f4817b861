//! Property-based tests for domain value objects and entities
//!
//! Uses proptest to verify invariants hold across a wide range of inputs.

#![allow(clippy::unwrap_used)]

use domain::{CalendarEvent, TargetDate, fingerprint};
use proptest::prelude::*;

mod fingerprint_tests {
    use super::*;

    proptest! {
        #[test]
        fn fingerprint_is_idempotent(
            summary in ".{0,40}",
            start in ".{0,25}",
            end in ".{0,25}",
            location in proptest::option::of(".{0,20}")
        ) {
            let a = fingerprint(&summary, &start, &end, location.as_deref());
            let b = fingerprint(&summary, &start, &end, location.as_deref());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn fingerprint_is_eight_hex_digits(summary in ".{0,40}") {
            let id = fingerprint(&summary, "s", "e", None);
            prop_assert_eq!(id.len(), 8);
            prop_assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn changing_summary_changes_id(summary in "[a-z]{1,20}", suffix in "[A-Z]") {
            let base = fingerprint(&summary, "2026-01-05T08:00:00Z", "2026-01-05T09:00:00Z", Some("A1"));
            let changed_summary = format!("{summary}{suffix}");
            let changed = fingerprint(&changed_summary, "2026-01-05T08:00:00Z", "2026-01-05T09:00:00Z", Some("A1"));
            prop_assert_ne!(base, changed);
        }

        #[test]
        fn changing_start_hour_changes_id(hour in 0u32..23) {
            let start = format!("2026-01-05T{hour:02}:00:00Z");
            let later = format!("2026-01-05T{:02}:00:00Z", hour + 1);
            prop_assert_ne!(
                fingerprint("Lecture", &start, "2026-01-06T00:00:00Z", None),
                fingerprint("Lecture", &later, "2026-01-06T00:00:00Z", None)
            );
        }

        #[test]
        fn changing_end_minute_changes_id(minute in 0u32..59) {
            let end = format!("2026-01-05T10:{minute:02}:00Z");
            let later = format!("2026-01-05T10:{:02}:00Z", minute + 1);
            prop_assert_ne!(
                fingerprint("Lecture", "2026-01-05T08:00:00Z", &end, None),
                fingerprint("Lecture", "2026-01-05T08:00:00Z", &later, None)
            );
        }

        #[test]
        fn changing_location_changes_id(room in 100u32..999) {
            let a = format!("R{room}");
            let b = format!("R{}", room + 1);
            prop_assert_ne!(
                fingerprint("Lecture", "s", "e", Some(&a)),
                fingerprint("Lecture", "s", "e", Some(&b))
            );
        }

        #[test]
        fn event_id_tracks_fingerprint(summary in "[a-zA-Z ]{1,30}", room in "[A-Z][0-9]{1,3}") {
            let event = CalendarEvent::new(
                summary.clone(),
                "2026-01-05T08:00:00Z",
                "2026-01-05T09:00:00Z",
                Some(room.clone()),
            );
            prop_assert_eq!(
                event.id,
                fingerprint(&summary, "2026-01-05T08:00:00Z", "2026-01-05T09:00:00Z", Some(&room))
            );
        }
    }
}

mod target_date_tests {
    use super::*;

    proptest! {
        #[test]
        fn valid_ranges_accepted(year in 1970i32..=2100, month in 1u32..=12, day in 0u32..=31) {
            let date = TargetDate::new(year, month, day);
            prop_assert!(date.is_ok());
            let date = date.unwrap();
            prop_assert_eq!(date.month_number(), month);
            prop_assert_eq!(date.is_month_scoped(), day == 0);
        }

        #[test]
        fn invalid_month_rejected(month in 13u32..=1000) {
            prop_assert!(TargetDate::new(2026, month, 1).is_err());
        }

        #[test]
        fn invalid_day_rejected(day in 32u32..=1000) {
            prop_assert!(TargetDate::new(2026, 1, day).is_err());
        }

        #[test]
        fn scopes_start_with_month(month in 1u32..=12, day in 0u32..=31) {
            let date = TargetDate::new(2026, month, day).unwrap();
            let scopes = date.scopes();
            prop_assert!(scopes[0].is_month_scoped());
            prop_assert_eq!(scopes.len(), if day == 0 { 1 } else { 2 });
        }
    }
}
