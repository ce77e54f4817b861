//! Candidate export URL value object

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::DomainError;

/// A fully-qualified URL that may serve the calendar export
///
/// Built from path conventions or discovered in portal HTML, then stamped
/// with the requested date parameters.
///
/// # Examples
///
/// ```
/// use domain::CandidateUrl;
///
/// let url = CandidateUrl::new("https://portal.example.com/export?ics=1").unwrap();
/// assert_eq!(url.as_str(), "https://portal.example.com/export?ics=1");
/// assert!(CandidateUrl::new("/export?ics=1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
#[serde(transparent)]
pub struct CandidateUrl {
    #[validate(url)]
    value: String,
}

impl CandidateUrl {
    /// Wrap an absolute URL
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationError`] for relative or malformed URLs.
    pub fn new(url: impl Into<String>) -> Result<Self, DomainError> {
        let candidate = Self { value: url.into() };
        candidate
            .validate()
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;
        Ok(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for CandidateUrl {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
