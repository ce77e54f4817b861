//! Retrieval request and outcome
//!
//! A retrieval is all-or-nothing from the caller's perspective: it either
//! yields the raw export bytes or a single user-facing failure.

use std::{
    fmt,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::DomainError,
    value_objects::{Credentials, TargetDate},
};

/// Input for one schedule retrieval
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// Portal login
    pub credentials: Credentials,
    /// Requested year
    pub year: i32,
    /// Requested month (1-12)
    pub month: u32,
    /// Requested day, `0` for the whole month
    pub day: u32,
    /// Per-operation timeout override
    pub timeout: Option<Duration>,
    /// Caller deadline checked between fallback steps
    pub deadline: Option<Instant>,
}

impl RetrievalRequest {
    /// Create a request for the given date
    pub fn new(credentials: Credentials, year: i32, month: u32, day: u32) -> Self {
        Self {
            credentials,
            year,
            month,
            day,
            timeout: None,
            deadline: None,
        }
    }

    /// Create a request for a validated target date
    pub fn for_target(credentials: Credentials, target: TargetDate) -> Self {
        Self::new(credentials, target.year(), target.month_number(), target.day())
    }

    /// Override the per-operation timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a deadline after which no further fallback step is started
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Validate credentials and date, returning the typed target
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationError`] for blank credentials or an
    /// out-of-range month/day.
    pub fn validate(&self) -> Result<TargetDate, DomainError> {
        self.credentials.validate()?;
        TargetDate::new(self.year, self.month, self.day)
    }
}

/// Category of a failed retrieval, each with its own user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request was malformed; nothing was attempted
    Validation,
    /// The portal rejected the login
    InvalidCredentials,
    /// A browser or network operation exceeded its timeout
    Timeout,
    /// Every fallback strategy missed
    NotFound,
    /// Anything else; the hint carries the underlying error text
    Unexpected,
}

impl FailureKind {
    /// Message shown to the end user
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Validation => "Invalid request: username, password and a month between 1 and 12 are required",
            Self::InvalidCredentials => "Login failed: username or password is incorrect",
            Self::Timeout => "The portal did not respond in time",
            Self::NotFound => "Could not load the calendar from the portal",
            Self::Unexpected => "An unexpected error occurred while loading the calendar",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Unexpected => "unexpected",
        };
        f.write_str(label)
    }
}

/// Result of one retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// Export bytes that passed calendar sniffing
    Success {
        /// Raw, undecoded response body
        raw_bytes: Vec<u8>,
    },
    /// The retrieval failed
    Failure {
        /// Failure category
        kind: FailureKind,
        /// User-facing message
        message: String,
        /// Non-localized diagnostic detail
        hint: Option<String>,
    },
}

impl RetrievalOutcome {
    /// Successful outcome
    pub const fn success(raw_bytes: Vec<u8>) -> Self {
        Self::Success { raw_bytes }
    }

    /// Failure with the kind's standard message
    pub fn failure(kind: FailureKind) -> Self {
        Self::Failure {
            kind,
            message: kind.user_message().to_string(),
            hint: None,
        }
    }

    /// Failure with a diagnostic hint
    pub fn failure_with_hint(kind: FailureKind, hint: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: kind.user_message().to_string(),
            hint: Some(hint.into()),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The raw bytes, if successful
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Success { raw_bytes } => Some(raw_bytes),
            Self::Failure { .. } => None,
        }
    }

    /// The failure kind, if failed
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}
