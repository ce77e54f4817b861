//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod schedule_port;

#[cfg(test)]
pub use schedule_port::MockSchedulePort;
pub use schedule_port::{DecodedSchedule, SchedulePort};
