//! Application services - Use case implementations

mod schedule_service;

pub use schedule_service::{ScheduleService, ScheduleSnapshot, SyncResult};
