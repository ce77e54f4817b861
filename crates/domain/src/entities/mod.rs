//! Domain entities - Objects with identity and lifecycle

mod calendar_event;
mod retrieval;

pub use calendar_event::{CalendarEvent, fingerprint};
pub use retrieval::{FailureKind, RetrievalOutcome, RetrievalRequest};
