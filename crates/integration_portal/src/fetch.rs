//! Export fetching and validation
//!
//! A candidate URL only counts as a hit when the portal answers 2xx with a
//! body that sniffs as iCalendar. The portal happily returns its login page
//! or an HTML error with status 200, so the status code alone says little.

use std::time::Duration;

use integration_ics::looks_like_calendar;
use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE, COOKIE, REFERER},
};
use tracing::{debug, instrument};

use crate::{
    error::PortalError,
    observer::{RetrievalObserver, events, preview},
    session::{FetchResponse, PortalSession},
};

/// `Accept` header preferring calendar data
pub const CALENDAR_ACCEPT: &str = "text/calendar, text/plain;q=0.9, */*;q=0.8";

/// Plain HTTP GET that carries browser cookies
///
/// Browser pages cannot hand back raw response bytes reliably, so exports
/// are fetched out-of-band with the page's cookies attached.
#[derive(Debug, Clone)]
pub struct CookieFetcher {
    client: Client,
    timeout: Duration,
}

impl CookieFetcher {
    /// Create a fetcher with the given request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, PortalError> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|e| PortalError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    /// GET `url` with `cookies`, `Accept` and an optional `Referer`
    #[instrument(skip(self, cookies), fields(cookies = cookies.len()))]
    pub async fn get(
        &self,
        url: &str,
        referer: Option<&str>,
        cookies: &[(String, String)],
    ) -> Result<FetchResponse, PortalError> {
        let mut request = self.client.get(url).header(ACCEPT, CALENDAR_ACCEPT);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookie_header(cookies));
        }

        let response = request.send().await.map_err(|e| self.map_error(&e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(&e))?;

        debug!(status, bytes = body.len(), "Export request finished");

        Ok(FetchResponse {
            status,
            final_url,
            content_type,
            body: body.to_vec(),
        })
    }

    fn map_error(&self, err: &reqwest::Error) -> PortalError {
        if err.is_timeout() {
            PortalError::timeout("Export request", self.timeout)
        } else {
            PortalError::RequestFailed(err.to_string())
        }
    }
}

/// `name=value; name2=value2`
pub fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fetch `url` through the session and keep the body only if it is calendar data
///
/// Misses are reported to the observer and yield `Ok(None)`; only transport
/// failures are errors.
pub async fn fetch_calendar(
    session: &dyn PortalSession,
    url: &str,
    observer: &dyn RetrievalObserver,
) -> Result<Option<Vec<u8>>, PortalError> {
    let referer = session.current_url().await.ok();
    observer.log(events::FETCH_ATTEMPT, url);

    let response = session.fetch(url, referer.as_deref()).await?;
    observer.log(
        events::FETCH_STATUS,
        &format!("{} {}", response.status, response.final_url),
    );

    if !response.is_success() {
        debug!(status = response.status, url, "Export candidate rejected by status");
        return Ok(None);
    }

    if !looks_like_calendar(&response.body) {
        observer.log(events::FETCH_MISMATCH, &preview(&response.body));
        debug!(
            content_type = response.content_type.as_deref().unwrap_or("-"),
            url, "Export candidate is not calendar data"
        );
        return Ok(None);
    }

    observer.log(events::FETCH_MATCH, url);
    Ok(Some(response.body))
}
