//! Retrieval progress callbacks
//!
//! Observers are purely informational. A UI shows `status` lines to the user;
//! `log` events feed a diagnostics view. Nothing an observer does can change
//! the outcome of a retrieval.

use tracing::{debug, info};

/// Event names passed to [`RetrievalObserver::log`]
pub mod events {
    pub const NAVIGATION_START: &str = "navigation_start";
    pub const NAVIGATION_END: &str = "navigation_end";
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const LOGIN_FAILURE: &str = "login_failure";
    pub const LOGIN_SKIPPED: &str = "login_skipped";
    pub const STEP_START: &str = "step_start";
    pub const FETCH_ATTEMPT: &str = "fetch_attempt";
    pub const FETCH_STATUS: &str = "fetch_status";
    pub const FETCH_MISMATCH: &str = "fetch_mismatch";
    pub const FETCH_MATCH: &str = "fetch_match";
    pub const RETRIEVAL_SUCCESS: &str = "retrieval_success";
    pub const RETRIEVAL_FAILURE: &str = "retrieval_failure";
}

/// Maximum number of body bytes shown for a non-calendar response
pub const PREVIEW_LIMIT: usize = 160;

/// Receives progress updates during a retrieval
pub trait RetrievalObserver: Send + Sync {
    /// Short human-readable progress line
    fn status(&self, text: &str);

    /// Structured diagnostic event
    fn log(&self, event: &str, data: &str);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RetrievalObserver for NoopObserver {
    fn status(&self, _text: &str) {}

    fn log(&self, _event: &str, _data: &str) {}
}

/// Observer that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RetrievalObserver for TracingObserver {
    fn status(&self, text: &str) {
        info!(status = %text, "Retrieval progress");
    }

    fn log(&self, event: &str, data: &str) {
        debug!(event, data = %data, "Retrieval event");
    }
}

/// Printable excerpt of a response body
///
/// Lossily decoded, cut to [`PREVIEW_LIMIT`] bytes, with control characters
/// replaced by spaces.
pub fn preview(body: &[u8]) -> String {
    let head = &body[..body.len().min(PREVIEW_LIMIT)];
    String::from_utf8_lossy(head)
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
