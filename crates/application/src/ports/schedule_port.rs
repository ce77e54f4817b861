//! Schedule source port
//!
//! Abstracts the portal retrieval and the export decoder so the service can
//! be tested without a browser.

use async_trait::async_trait;
use domain::{CalendarEvent, RetrievalOutcome, RetrievalRequest};
#[cfg(test)]
use mockall::automock;

/// Events decoded from one export, with the text encoding that was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSchedule {
    pub events: Vec<CalendarEvent>,
    pub encoding: String,
}

/// Port for retrieving and decoding schedule exports
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SchedulePort: Send + Sync {
    /// Log in and fetch the raw export for the request
    async fn retrieve(&self, request: RetrievalRequest) -> RetrievalOutcome;

    /// Decode raw export bytes
    fn decode(&self, raw: &[u8]) -> DecodedSchedule;
}
