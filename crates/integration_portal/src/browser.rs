//! Chromium-backed portal session
//!
//! Page interaction goes through the DevTools protocol via `chromiumoxide`.
//! Export downloads go through [`CookieFetcher`] with the cookies the
//! browser would send to the export URL, because a navigated page only
//! exposes the rendered document.

use std::{future::Future, path::PathBuf, time::Duration};

use async_trait::async_trait;
use chromiumoxide::{
    Browser, BrowserConfig, Page, cdp::browser_protocol::network::GetCookiesParams,
    error::CdpError,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    error::PortalError,
    fetch::CookieFetcher,
    session::{ElementMatcher, FetchResponse, PortalSession, SessionLauncher, WaitOutcome},
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const QUIET_PERIOD: Duration = Duration::from_millis(500);

/// How to launch Chromium
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chromium binary; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Persistent profile directory; a throwaway profile is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,

    /// Disk cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Pass `--no-sandbox` (needed in some containers)
    #[serde(default)]
    pub no_sandbox: bool,

    /// User agent for export requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

const fn default_headless() -> bool {
    true
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            profile_dir: None,
            cache_dir: None,
            no_sandbox: false,
            user_agent: None,
        }
    }
}

impl BrowserSettings {
    fn to_config(&self, timeout: Duration) -> Result<BrowserConfig, PortalError> {
        let mut builder = BrowserConfig::builder().request_timeout(timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if let Some(profile) = &self.profile_dir {
            builder = builder.user_data_dir(profile);
        }
        if let Some(cache) = &self.cache_dir {
            builder = builder.arg(format!("--disk-cache-dir={}", cache.display()));
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(PortalError::Browser)
    }
}

/// Launches [`ChromiumSession`]s
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    /// Create a launcher
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::ConfigurationError`] when a configured
    /// executable does not exist.
    pub fn new(settings: BrowserSettings) -> Result<Self, PortalError> {
        if let Some(executable) = settings.executable.as_ref().filter(|e| !e.exists()) {
            return Err(PortalError::ConfigurationError(format!(
                "browser executable not found: {}",
                executable.display()
            )));
        }
        Ok(Self { settings })
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self, timeout: Duration) -> Result<Box<dyn PortalSession>, PortalError> {
        let config = self.settings.to_config(timeout)?;
        let fetcher = CookieFetcher::new(timeout, self.settings.user_agent.as_deref())?;

        info!(headless = self.settings.headless, "Launching Chromium");
        let (browser, mut handler) = tokio::time::timeout(timeout, Browser::launch(config))
            .await
            .map_err(|_| PortalError::timeout("Browser launch", timeout))?
            .map_err(|e| PortalError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Chromium handler stopped");
                    break;
                }
            }
        });

        let page = match tokio::time::timeout(timeout, browser.new_page("about:blank")).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                handler.abort();
                return Err(PortalError::Browser(e.to_string()));
            },
            Err(_) => {
                handler.abort();
                return Err(PortalError::timeout("Opening page", timeout));
            },
        };

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(browser),
            page,
            handler,
            fetcher,
            timeout,
        }))
    }
}

/// One Chromium instance with a single page
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    fetcher: CookieFetcher,
    timeout: Duration,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl ChromiumSession {
    async fn bounded<T, F>(
        &self,
        operation: &str,
        future: F,
        wrap: fn(String) -> PortalError,
    ) -> Result<T, PortalError>
    where
        F: Future<Output = Result<T, CdpError>> + Send,
    {
        tokio::time::timeout(self.timeout, future)
            .await
            .map_err(|_| PortalError::timeout(operation, self.timeout))?
            .map_err(|e| wrap(format!("{operation}: {e}")))
    }

    /// Evaluate `script` for a wait loop, bounded by `deadline`
    ///
    /// Failures are expected while a document is being replaced, so they
    /// are logged and read as "no answer yet".
    async fn poll<T: DeserializeOwned>(&self, script: &str, deadline: Instant) -> Option<T> {
        match tokio::time::timeout_at(deadline, self.page.evaluate(script)).await {
            Ok(Ok(result)) => result.into_value::<T>().ok(),
            Ok(Err(e)) => {
                debug!(error = %e, "Page poll failed");
                None
            },
            Err(_) => None,
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> Result<T, PortalError> {
        let result = self
            .bounded("Script", self.page.evaluate(script), PortalError::Interaction)
            .await?;
        result
            .into_value::<T>()
            .map_err(|e| PortalError::Interaction(format!("Script result: {e}")))
    }
}

/// JSON-quote a string for embedding in a script
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Script expression evaluating to the matched element or `null`
fn element_expression(matcher: &ElementMatcher) -> String {
    match matcher {
        ElementMatcher::Css(selector) => {
            format!("document.querySelector({})", js_string(selector))
        },
        ElementMatcher::ButtonText(text) => format!(
            "(Array.from(document.querySelectorAll('button, input[type=\"submit\"], input[type=\"button\"]'))\
             .find(el => ((el.innerText || el.value || '').trim()) === {}) || null)",
            js_string(text)
        ),
    }
}

fn fill_script(matcher: &ElementMatcher, value: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; el.focus(); el.value = {}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        element_expression(matcher),
        js_string(value)
    )
}

fn click_script(matcher: &ElementMatcher) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; window.__schedsyncClicked = true; \
         el.click(); return true; }})()",
        element_expression(matcher)
    )
}

const ANCHORS_SCRIPT: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.getAttribute('href') || '')";

const READY_STATE_SCRIPT: &str = "document.readyState";

/// True while the page still shows the document [`click_script`] ran in
const STAMP_PRESENT_SCRIPT: &str = "window.__schedsyncClicked === true";

#[async_trait]
impl PortalSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), PortalError> {
        debug!(url, "Navigating");
        self.bounded("Navigation", self.page.goto(url), PortalError::Navigation)
            .await
            .map(|_| ())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.poll::<String>(READY_STATE_SCRIPT, deadline).await {
                Some(state) if state == "complete" => {
                    tokio::time::sleep(QUIET_PERIOD).await;
                    return WaitOutcome::Ready;
                },
                _ => {},
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        WaitOutcome::TimedOut
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() >= deadline {
                debug!("Page kept the clicked document");
                return WaitOutcome::TimedOut;
            }
            // Errors while the old context is torn down count as still navigating
            if self.poll::<bool>(STAMP_PRESENT_SCRIPT, deadline).await == Some(false) {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        if tokio::time::timeout_at(deadline, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            return WaitOutcome::TimedOut;
        }
        self.wait_for_network_idle(deadline.saturating_duration_since(Instant::now()))
            .await
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        self.bounded("Reading URL", self.page.url(), PortalError::Interaction)
            .await
            .map(Option::unwrap_or_default)
    }

    async fn content(&self) -> Result<String, PortalError> {
        self.bounded("Reading page", self.page.content(), PortalError::Interaction)
            .await
    }

    async fn exists(&self, matcher: &ElementMatcher) -> Result<bool, PortalError> {
        self.evaluate(format!("({}) !== null", element_expression(matcher)))
            .await
    }

    async fn fill(&self, matcher: &ElementMatcher, value: &str) -> Result<(), PortalError> {
        if self.evaluate::<bool>(fill_script(matcher, value)).await? {
            Ok(())
        } else {
            Err(PortalError::Interaction(format!("{matcher} not found")))
        }
    }

    async fn click(&self, matcher: &ElementMatcher) -> Result<(), PortalError> {
        if self.evaluate::<bool>(click_script(matcher)).await? {
            Ok(())
        } else {
            Err(PortalError::Interaction(format!("{matcher} not found")))
        }
    }

    async fn anchors(&self) -> Result<Vec<String>, PortalError> {
        self.evaluate(ANCHORS_SCRIPT.to_string()).await
    }

    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, PortalError> {
        let scoped = GetCookiesParams::builder().url(url).build();
        let cookies: Vec<(String, String)> = self
            .bounded(
                "Reading cookies",
                async {
                    self.page
                        .execute(scoped)
                        .await
                        .map(|response| response.result.cookies)
                },
                PortalError::Interaction,
            )
            .await?
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect();
        self.fetcher.get(url, referer, &cookies).await
    }

    async fn close(&self) -> Result<(), PortalError> {
        let mut browser = self.browser.lock().await;
        let closed = self
            .bounded("Closing browser", browser.close(), PortalError::Browser)
            .await;
        if let Err(e) = &closed {
            warn!(error = %e, "Graceful close failed, killing Chromium");
            if let Some(Err(e)) = browser.kill().await {
                warn!(error = %e, "Failed to kill Chromium");
            }
        }
        match tokio::time::timeout(self.timeout, browser.wait()).await {
            Ok(Ok(_)) => {},
            Ok(Err(e)) => warn!(error = %e, "Chromium process did not exit cleanly"),
            Err(_) => {
                warn!("Chromium did not exit in time, killing it");
                if let Some(Err(e)) = browser.kill().await {
                    warn!(error = %e, "Failed to kill Chromium");
                }
            },
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BrowserSettings::default();
        assert!(settings.headless);
        assert!(settings.executable.is_none());
        assert!(!settings.no_sandbox);
    }

    #[test]
    fn test_missing_executable_is_rejected() {
        let settings = BrowserSettings {
            executable: Some(PathBuf::from("/nonexistent/chromium-binary")),
            ..Default::default()
        };
        assert!(matches!(
            ChromiumLauncher::new(settings),
            Err(PortalError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_click_stamps_the_document_it_ran_in() {
        let script = click_script(&ElementMatcher::ButtonText("Anmelden"));
        assert!(script.contains("window.__schedsyncClicked = true"));
        assert!(script.find("__schedsyncClicked") < script.find("el.click()"));
        assert!(STAMP_PRESENT_SCRIPT.contains("window.__schedsyncClicked"));
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b'c\d"#), r#""a\"b'c\\d""#);
    }

    #[test]
    fn test_css_expression() {
        assert_eq!(
            element_expression(&ElementMatcher::Css(r#"input[type="password"]"#)),
            r#"document.querySelector("input[type=\"password\"]")"#
        );
    }

    #[test]
    fn test_button_text_expression_embeds_label() {
        let expr = element_expression(&ElementMatcher::ButtonText("Anmelden"));
        assert!(expr.contains(r#"=== "Anmelden""#));
        assert!(expr.ends_with("|| null)"));
    }

    #[test]
    fn test_fill_script_quotes_value() {
        let script = fill_script(&ElementMatcher::Css("#pw"), "p\"w'</script>");
        assert!(script.contains(r#"el.value = "p\"w'</script>";"#));
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: BrowserSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, BrowserSettings::default());
    }
}
