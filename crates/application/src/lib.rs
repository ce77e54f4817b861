//! Application layer - Use cases and orchestration
//!
//! Defines the schedule port implemented by infrastructure and the service
//! that turns a retrieval into a decoded schedule snapshot.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
