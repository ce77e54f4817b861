//! Portal configuration

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where the portal lives and how its export endpoint is shaped
///
/// The defaults describe the path conventions the portal has used so far.
/// Every value can be overridden when the portal changes its layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal base URL; relative links resolve against it
    #[serde(default)]
    pub base_url: String,

    /// Landing page holding the login form, relative to `base_url`
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path fragment that identifies calendar export links
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Pages visited in order to mint session tokens (list, schedule, index)
    #[serde(default = "default_bootstrap_paths")]
    pub bootstrap_paths: Vec<String>,

    /// Page listing the calendar export link
    #[serde(default = "default_calendar_index_path")]
    pub calendar_index_path: String,

    /// Regexes selecting session token query parameters by name
    #[serde(default = "default_token_patterns")]
    pub token_patterns: Vec<String>,

    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_login_path() -> String {
    "/".to_string()
}

fn default_export_path() -> String {
    "/calendar/export".to_string()
}

fn default_bootstrap_paths() -> Vec<String> {
    vec![
        "/list".to_string(),
        "/schedule".to_string(),
        "/index".to_string(),
    ]
}

fn default_calendar_index_path() -> String {
    "/calendar".to_string()
}

fn default_token_patterns() -> Vec<String> {
    vec![
        r"^caltoken\d+$".to_string(),
        r"^sid\d+$".to_string(),
        r"^sec".to_string(),
    ]
}

const fn default_timeout_secs() -> u64 {
    45
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: default_login_path(),
            export_path: default_export_path(),
            bootstrap_paths: default_bootstrap_paths(),
            calendar_index_path: default_calendar_index_path(),
            token_patterns: default_token_patterns(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PortalConfig {
    /// Create a configuration for the given portal with default paths
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create a configuration for testing (local base URL, short timeout)
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            timeout_secs: 5,
            ..Self::new(base_url)
        }
    }

    /// Per-operation timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must be set".to_string());
        }

        let base = url::Url::parse(&self.base_url)
            .map_err(|e| format!("base_url is not a valid URL: {e}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err("base_url must use http or https".to_string());
        }

        if self.export_path.trim().is_empty() {
            return Err("export_path must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.token_patterns.is_empty() {
            return Err("token_patterns must contain at least one pattern".to_string());
        }

        for pattern in &self.token_patterns {
            Regex::new(pattern)
                .map_err(|e| format!("token pattern {pattern:?} is invalid: {e}"))?;
        }

        Ok(())
    }
}
