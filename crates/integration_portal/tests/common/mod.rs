//! Scripted portal for driving the retrieval flow without a browser

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use integration_portal::{
    ElementMatcher, FetchResponse, PortalError, PortalSession, RetrievalObserver, SessionLauncher,
    WaitOutcome,
};
use parking_lot::Mutex;

pub const BASE: &str = "https://portal.example.com";

pub const CALENDAR: &[u8] = b"BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nSUMMARY:Mathe\r\nDTSTART:20260302T080000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub final_url: Option<String>,
    pub anchors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub pages: HashMap<String, FakePage>,
    pub responses: HashMap<String, (u16, Vec<u8>)>,
    pub show_login_form: bool,
    pub accepted_password: String,
    pub logged_in: bool,
    pub slow_login: bool,
    pub pending_login: Option<bool>,
    pub current_url: String,
    pub navigations: Vec<String>,
    pub fetches: Vec<(String, Option<String>)>,
    pub fills: Vec<(ElementMatcher, String)>,
    pub clicks: Vec<ElementMatcher>,
    pub closed: bool,
    pub fail_navigation: Option<PortalErrorKind>,
    pub launches: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum PortalErrorKind {
    Timeout,
    Crash,
}

/// Shared handle to the scripted portal
#[derive(Debug, Clone, Default)]
pub struct FakePortal {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakePortal {
    pub fn with_login(password: &str) -> Self {
        let portal = Self::default();
        {
            let mut state = portal.state.lock();
            state.show_login_form = true;
            state.accepted_password = password.to_string();
            state.current_url = "about:blank".to_string();
        }
        portal
    }

    pub fn page(&self, path: &str, page: FakePage) -> &Self {
        self.state.lock().pages.insert(format!("{BASE}{path}"), page);
        self
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) -> &Self {
        self.state
            .lock()
            .responses
            .insert(url.to_string(), (status, body.to_vec()));
        self
    }

    /// Keep showing the login form after submit until the page navigates
    pub fn slow_login(&self) -> &Self {
        self.state.lock().slow_login = true;
        self
    }

    pub fn fail_navigation(&self, kind: PortalErrorKind) {
        self.state.lock().fail_navigation = Some(kind);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().fetches.iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn launches(&self) -> usize {
        self.state.lock().launches
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            state: Arc::clone(&self.state),
        }
    }

    pub fn launcher(&self) -> Arc<dyn SessionLauncher> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SessionLauncher for FakePortal {
    async fn launch(&self, _timeout: Duration) -> Result<Box<dyn PortalSession>, PortalError> {
        self.state.lock().launches += 1;
        Ok(Box::new(self.session()))
    }
}

#[derive(Debug)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

fn login_form_has(matcher: &ElementMatcher) -> bool {
    matches!(
        matcher,
        ElementMatcher::Css(r#"input[type="password"]"#)
            | ElementMatcher::Css(r#"input[name*="user" i]"#)
            | ElementMatcher::Css(r#"input[type="text"]"#)
            | ElementMatcher::ButtonText("Anmelden")
            | ElementMatcher::Css(r#"[type="submit"]"#)
    )
}

#[async_trait]
impl PortalSession for FakeSession {
    async fn goto(&self, url: &str) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        match state.fail_navigation {
            Some(PortalErrorKind::Timeout) => {
                return Err(PortalError::Timeout {
                    operation: "Navigation".to_string(),
                    timeout_secs: 5,
                });
            },
            Some(PortalErrorKind::Crash) => {
                return Err(PortalError::Browser("renderer crashed".to_string()));
            },
            None => {},
        }
        state.navigations.push(url.to_string());
        let final_url = state
            .pages
            .get(url)
            .and_then(|p| p.final_url.clone())
            .unwrap_or_else(|| url.to_string());
        state.current_url = final_url;
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> WaitOutcome {
        WaitOutcome::Ready
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> WaitOutcome {
        let mut state = self.state.lock();
        if let Some(accepted) = state.pending_login.take() {
            state.logged_in = accepted;
        }
        WaitOutcome::Ready
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        Ok(self.state.lock().current_url.clone())
    }

    async fn content(&self) -> Result<String, PortalError> {
        let state = self.state.lock();
        Ok(state
            .pages
            .get(&state.current_url)
            .map(|p| p.html.clone())
            .unwrap_or_default())
    }

    async fn exists(&self, matcher: &ElementMatcher) -> Result<bool, PortalError> {
        let state = self.state.lock();
        Ok(state.show_login_form && !state.logged_in && login_form_has(matcher))
    }

    async fn fill(&self, matcher: &ElementMatcher, value: &str) -> Result<(), PortalError> {
        self.state.lock().fills.push((*matcher, value.to_string()));
        Ok(())
    }

    async fn click(&self, matcher: &ElementMatcher) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.clicks.push(*matcher);
        let password_ok = state
            .fills
            .iter()
            .any(|(m, v)| *m == ElementMatcher::Css(r#"input[type="password"]"#) && *v == state.accepted_password);
        if state.slow_login {
            state.pending_login = Some(password_ok);
        } else {
            state.logged_in = password_ok;
        }
        Ok(())
    }

    async fn anchors(&self) -> Result<Vec<String>, PortalError> {
        let state = self.state.lock();
        Ok(state
            .pages
            .get(&state.current_url)
            .map(|p| p.anchors.clone())
            .unwrap_or_default())
    }

    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, PortalError> {
        let mut state = self.state.lock();
        state
            .fetches
            .push((url.to_string(), referer.map(ToString::to_string)));
        let (status, body) = state
            .responses
            .get(url)
            .cloned()
            .unwrap_or((404, b"Not Found".to_vec()));
        Ok(FetchResponse {
            status,
            final_url: url.to_string(),
            content_type: None,
            body,
        })
    }

    async fn close(&self) -> Result<(), PortalError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

/// Observer that records every callback
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub statuses: Mutex<Vec<String>>,
    pub events: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn events_named(&self, name: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(e, _)| e == name)
            .map(|(_, d)| d.clone())
            .collect()
    }
}

impl RetrievalObserver for RecordingObserver {
    fn status(&self, text: &str) {
        self.statuses.lock().push(text.to_string());
    }

    fn log(&self, event: &str, data: &str) {
        self.events.lock().push((event.to_string(), data.to_string()));
    }
}
