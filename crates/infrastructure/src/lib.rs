//! Infrastructure layer - Adapters for external systems
//!
//! Implements the schedule port on top of the browser-driven portal client
//! and the calendar decoder, and provides configuration loading, logging
//! setup and the cron-based re-sync.

pub mod adapters;
pub mod config;
pub mod scheduler;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, SyncAppConfig};
pub use scheduler::{
    RequestFactory, SchedulerError, SyncEvent, SyncOutcome, SyncScheduler, SyncStats, schedules,
};
pub use telemetry::{TelemetryConfig, TelemetryError, init_telemetry};
