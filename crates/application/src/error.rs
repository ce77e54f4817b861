//! Application-level errors

use domain::{DomainError, FailureKind};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The portal retrieval failed
    #[error("{message}")]
    Retrieval {
        /// Failure category
        kind: FailureKind,
        /// User-facing message
        message: String,
        /// Diagnostic detail
        hint: Option<String>,
    },

    /// Another sync is still running
    #[error("A schedule sync is already in progress")]
    SyncInProgress,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SyncInProgress
                | Self::Retrieval {
                    kind: FailureKind::Timeout | FailureKind::Unexpected,
                    ..
                }
        )
    }

    /// The retrieval failure kind, if this is a retrieval failure
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Retrieval { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
