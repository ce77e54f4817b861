//! Scheduled re-sync settings

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When the schedule is re-fetched in `watch` mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAppConfig {
    /// Enable scheduled syncs
    #[serde(default = "super::default_true")]
    pub enabled: bool,

    /// Cron expression (6 fields: sec min hour day month weekday)
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Run one sync immediately when the scheduler starts
    #[serde(default = "super::default_true")]
    pub run_on_start: bool,
}

fn default_cron() -> String {
    "0 0 */6 * * *".to_string()
}

impl Default for SyncAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
            run_on_start: true,
        }
    }
}

impl SyncAppConfig {
    /// Validate the cron expression
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression does not parse.
    pub fn validate(&self) -> Result<(), String> {
        cron::Schedule::from_str(&self.cron)
            .map(|_| ())
            .map_err(|e| format!("cron expression {:?} is invalid: {e}", self.cron))
    }
}
