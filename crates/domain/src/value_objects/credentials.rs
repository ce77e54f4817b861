//! Portal credentials value object
//!
//! The password is held as a [`SecretString`] so it is zeroized on drop and
//! never shows up in `Debug` output or log fields.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::errors::DomainError;

/// Username/password pair for one portal login
///
/// Owned by the caller for the duration of a single retrieval. Not
/// serializable on purpose.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and a plaintext password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Create credentials from an already-wrapped secret
    pub fn from_secret(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The login name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, exposed for filling a form field
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Check that neither part is blank
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationError`] naming the blank field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.username.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "username must not be empty".to_string(),
            ));
        }
        if self.password.expose_secret().is_empty() {
            return Err(DomainError::ValidationError(
                "password must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
