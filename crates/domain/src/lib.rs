//! Domain layer for schedsync
//!
//! Contains the schedule entities, request value objects, and domain errors.
//! This layer has no I/O and defines the ubiquitous language shared by the
//! portal retrieval engine and the calendar decoder.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
