//! Logging setup
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and either
//! human-readable or JSON output on stderr. `RUST_LOG` overrides the
//! configured filter.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "integration_portal=debug")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json: false,
        }
    }
}

/// Telemetry initialization errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive did not parse
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber was already installed
    #[error("Failed to initialize telemetry: {0}")]
    Init(String),
}

/// Build the filter: `RUST_LOG` if set, the configured filter otherwise
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .map_err(|e| TelemetryError::InvalidFilter(format!("{}: {e}", config.log_filter))),
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
    }

    info!(json = config.json, "Telemetry initialized");
    Ok(())
}
