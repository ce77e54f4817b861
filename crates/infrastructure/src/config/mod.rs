//! Application configuration
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config.toml` in the working directory (or an explicit file)
//! 3. `SCHEDSYNC_*` environment variables; nested keys use `__`, e.g.
//!    `SCHEDSYNC_PORTAL__BASE_URL`
//!
//! Credentials are read from `SCHEDSYNC_USERNAME` and `SCHEDSYNC_PASSWORD`.
//! The password is never serialized back out.

mod sync;

use std::{fmt, path::Path};

use domain::Credentials;
use integration_portal::{BrowserSettings, PortalConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use sync::SyncAppConfig;

use crate::telemetry::TelemetryConfig;

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Main application configuration
#[derive(Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Portal login name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Portal password (sensitive - uses `SecretString`)
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Portal location and path conventions
    #[serde(default)]
    pub portal: PortalConfig,

    /// Chromium launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Scheduled re-sync
    #[serde(default)]
    pub sync: SyncAppConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("portal", &self.portal)
            .field("browser", &self.browser)
            .field("sync", &self.sync)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(config::File::with_name("config").required(false))
    }

    /// Load configuration from an explicit file and the environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            // Override with environment variables (e.g., SCHEDSYNC_PORTAL__TIMEOUT_SECS)
            .add_source(
                config::Environment::with_prefix("SCHEDSYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("portal.bootstrap_paths")
                    .with_list_parse_key("portal.token_patterns")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        debug!(
            base_url = %loaded.portal.base_url,
            has_credentials = loaded.credentials().is_some(),
            "Configuration loaded"
        );
        Ok(loaded)
    }

    /// Credentials, if both username and password are configured
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref()?;
        let password = self.password.as_ref()?;
        Some(Credentials::from_secret(
            username,
            SecretString::from(password.expose_secret().to_string()),
        ))
    }

    /// Validate all sections
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.portal.validate().map_err(|e| format!("portal: {e}"))?;
        self.sync.validate().map_err(|e| format!("sync: {e}"))?;
        Ok(())
    }

    /// Effective configuration as TOML, without secrets
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            portal: PortalConfig::new("https://portal.example.com"),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_requires_base_url() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.starts_with("portal:"));
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_bad_cron_is_reported() {
        let mut config = valid();
        config.sync.cron = "nope".to_string();
        assert!(config.validate().unwrap_err().starts_with("sync:"));
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = valid();
        assert!(config.credentials().is_none());

        config.username = Some("jane".to_string());
        assert!(config.credentials().is_none());

        config.password = Some(SecretString::from("hunter2".to_string()));
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.username(), "jane");
        assert_eq!(credentials.expose_password(), "hunter2");
    }

    #[test]
    fn test_toml_never_contains_password() {
        let mut config = valid();
        config.username = Some("jane".to_string());
        config.password = Some(SecretString::from("hunter2".to_string()));

        let toml = config.to_toml().unwrap();
        assert!(toml.contains("jane"));
        assert!(toml.contains("[portal]"));
        assert!(!toml.contains("hunter2"));
        assert!(!toml.contains("password"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = valid();
        config.password = Some(SecretString::from("hunter2".to_string()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
