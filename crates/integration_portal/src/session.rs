//! Browser session abstraction
//!
//! The retrieval flow only needs a narrow slice of a browser: navigate, look
//! for elements, type, click, read the page, and issue a GET that carries the
//! page's cookies. [`PortalSession`] captures exactly that so the flow can be
//! driven by Chromium in production and by scripted fakes in tests.

use std::{fmt, time::Duration};

use async_trait::async_trait;

use crate::error::PortalError;

/// Result of a best-effort wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The page settled
    Ready,
    /// The wait gave up; the caller carries on regardless
    TimedOut,
}

/// How to locate an element on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementMatcher {
    /// A CSS selector passed to `querySelector`
    Css(&'static str),
    /// A button or submit input whose trimmed label equals the text
    ButtonText(&'static str),
}

impl fmt::Display for ElementMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css({selector})"),
            Self::ButtonText(text) => write!(f, "button({text})"),
        }
    }
}

/// Response of an authenticated GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the status is 2xx
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A live, authenticated-or-not browser session
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Navigate the page to `url`
    async fn goto(&self, url: &str) -> Result<(), PortalError>;

    /// Wait until the page stops loading, giving up after `timeout`
    async fn wait_for_network_idle(&self, timeout: Duration) -> WaitOutcome;

    /// Wait until a click has replaced the page's document and the new one
    /// has loaded, giving up after `timeout`
    ///
    /// A click that never leaves the document, such as a form handled by
    /// script, ends in [`WaitOutcome::TimedOut`].
    async fn wait_for_navigation(&self, timeout: Duration) -> WaitOutcome;

    /// The page's current URL
    async fn current_url(&self) -> Result<String, PortalError>;

    /// The page's serialized HTML
    async fn content(&self) -> Result<String, PortalError>;

    /// Whether an element matching `matcher` is present
    async fn exists(&self, matcher: &ElementMatcher) -> Result<bool, PortalError>;

    /// Type `value` into the element matching `matcher`
    async fn fill(&self, matcher: &ElementMatcher, value: &str) -> Result<(), PortalError>;

    /// Click the element matching `matcher`
    async fn click(&self, matcher: &ElementMatcher) -> Result<(), PortalError>;

    /// Raw `href` attributes of every anchor on the page
    async fn anchors(&self) -> Result<Vec<String>, PortalError>;

    /// GET `url` with the session's cookies and the given referer
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, PortalError>;

    /// Tear the session down
    async fn close(&self) -> Result<(), PortalError>;
}

/// Creates fresh sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Launch a session whose operations are bounded by `timeout`
    async fn launch(&self, timeout: Duration) -> Result<Box<dyn PortalSession>, PortalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_success_range() {
        let mut response = FetchResponse {
            status: 200,
            final_url: "https://portal.example.com/x".to_string(),
            content_type: None,
            body: Vec::new(),
        };
        assert!(response.is_success());
        response.status = 204;
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 404;
        assert!(!response.is_success());
    }

    #[test]
    fn test_matcher_display() {
        assert_eq!(
            ElementMatcher::Css("input[type=\"password\"]").to_string(),
            "css(input[type=\"password\"])"
        );
        assert_eq!(ElementMatcher::ButtonText("Anmelden").to_string(), "button(Anmelden)");
    }
}
