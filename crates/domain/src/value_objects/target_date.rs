//! Target date value object
//!
//! The portal accepts either a month-scoped or a day-scoped export query.
//! A day of `0` is the sentinel for "whole month".

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::DomainError;

/// A validated `{year, month, day}` triple where `day == 0` means the whole month
///
/// # Examples
///
/// ```
/// use domain::TargetDate;
///
/// let date = TargetDate::new(2026, 1, 5).unwrap();
/// assert_eq!(date.day_param(), "5");
/// assert!(date.month_scoped().is_month_scoped());
/// assert_eq!(date.month_scoped().day_param(), "");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct TargetDate {
    #[validate(range(min = 1970, max = 9999))]
    year: i32,
    #[validate(range(min = 1, max = 12))]
    month: u32,
    #[validate(range(max = 31))]
    day: u32,
}

impl TargetDate {
    /// Create a target date, validating the ranges
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationError`] when the month is outside
    /// `1..=12`, the day outside `0..=31`, or the year implausible.
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, DomainError> {
        let candidate = Self { year, month, day };
        candidate
            .validate()
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;
        Ok(candidate)
    }

    /// Target the whole month
    pub fn month(year: i32, month: u32) -> Result<Self, DomainError> {
        Self::new(year, month, 0)
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn month_number(&self) -> u32 {
        self.month
    }

    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Whether this targets the whole month
    pub const fn is_month_scoped(&self) -> bool {
        self.day == 0
    }

    /// The same month with the day sentinel applied
    #[must_use]
    pub const fn month_scoped(&self) -> Self {
        Self {
            year: self.year,
            month: self.month,
            day: 0,
        }
    }

    /// Query scopes to try, month first, then the specific day if one was given
    pub fn scopes(&self) -> Vec<Self> {
        let mut scopes = vec![self.month_scoped()];
        if !self.is_month_scoped() {
            scopes.push(*self);
        }
        scopes
    }

    /// Value for the portal's `day` query parameter (empty for the month sentinel)
    pub fn day_param(&self) -> String {
        if self.day == 0 {
            String::new()
        } else {
            self.day.to_string()
        }
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.day == 0 {
            write!(f, "{:04}-{:02}", self.year, self.month)
        } else {
            write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(TargetDate::new(2026, 0, 1).is_err());
        assert!(TargetDate::new(2026, 13, 1).is_err());
    }

    #[test]
    fn day_out_of_range_is_rejected() {
        assert!(TargetDate::new(2026, 1, 32).is_err());
    }

    #[test]
    fn day_sentinel_is_month_scoped() {
        let date = TargetDate::month(2026, 3).unwrap();
        assert!(date.is_month_scoped());
        assert_eq!(date.day_param(), "");
        assert_eq!(date.to_string(), "2026-03");
    }

    #[test]
    fn scopes_try_month_then_day() {
        let date = TargetDate::new(2026, 3, 14).unwrap();
        let scopes = date.scopes();
        assert_eq!(scopes.len(), 2);
        assert!(scopes[0].is_month_scoped());
        assert_eq!(scopes[1].day(), 14);
    }

    #[test]
    fn month_target_has_single_scope() {
        let date = TargetDate::month(2026, 3).unwrap();
        assert_eq!(date.scopes(), vec![date]);
    }

    #[test]
    fn display_includes_day_when_set() {
        let date = TargetDate::new(2026, 1, 5).unwrap();
        assert_eq!(date.to_string(), "2026-01-05");
    }
}
