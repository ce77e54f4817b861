//! Portal retrieval error types

use thiserror::Error;

/// Errors raised while driving the portal
///
/// None of these escape [`crate::PortalClient::retrieve`]; they are folded
/// into a [`domain::RetrievalOutcome::Failure`] there.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The browser could not be launched or crashed
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation to a portal page failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A page script or element interaction failed
    #[error("Page interaction failed: {0}")]
    Interaction(String),

    /// The login form was only partially present
    #[error("Login form not recognized: {0}")]
    LoginForm(String),

    /// HTTP transport error while fetching an export
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// A URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid portal configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A single operation exceeded its timeout
    #[error("{operation} timed out after {timeout_secs} seconds")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// The caller's deadline passed between fallback steps
    #[error("Retrieval deadline exceeded")]
    DeadlineExceeded,
}

impl PortalError {
    /// Returns true if this error should surface as a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::DeadlineExceeded)
    }

    pub(crate) fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs: timeout.as_secs(),
        }
    }
}

impl From<url::ParseError> for PortalError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
