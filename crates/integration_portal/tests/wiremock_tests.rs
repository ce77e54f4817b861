//! HTTP-level tests for export fetching using wiremock

use std::time::Duration;

use async_trait::async_trait;
use integration_portal::{
    ElementMatcher, FetchResponse, NoopObserver, PortalError, PortalSession, WaitOutcome,
    fetch::{CALENDAR_ACCEPT, CookieFetcher, fetch_calendar},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, headers, method, path, query_param},
};

const CALENDAR: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

fn cookies() -> Vec<(String, String)> {
    vec![
        ("PHPSESSID".to_string(), "s3ss10n".to_string()),
        ("lang".to_string(), "de".to_string()),
    ]
}

/// Session that only knows how to fetch
struct HttpSession {
    fetcher: CookieFetcher,
    page_url: String,
}

#[async_trait]
impl PortalSession for HttpSession {
    async fn goto(&self, _url: &str) -> Result<(), PortalError> {
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> WaitOutcome {
        WaitOutcome::Ready
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> WaitOutcome {
        WaitOutcome::Ready
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        Ok(self.page_url.clone())
    }

    async fn content(&self) -> Result<String, PortalError> {
        Ok(String::new())
    }

    async fn exists(&self, _matcher: &ElementMatcher) -> Result<bool, PortalError> {
        Ok(false)
    }

    async fn fill(&self, _matcher: &ElementMatcher, _value: &str) -> Result<(), PortalError> {
        Ok(())
    }

    async fn click(&self, _matcher: &ElementMatcher) -> Result<(), PortalError> {
        Ok(())
    }

    async fn anchors(&self) -> Result<Vec<String>, PortalError> {
        Ok(Vec::new())
    }

    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, PortalError> {
        self.fetcher.get(url, referer, &cookies()).await
    }

    async fn close(&self) -> Result<(), PortalError> {
        Ok(())
    }
}

fn fetcher() -> CookieFetcher {
    CookieFetcher::new(Duration::from_secs(5), None).unwrap()
}

#[tokio::test]
async fn test_get_sends_cookies_accept_and_referer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendar/export"))
        .and(query_param("ics", "1"))
        .and(headers(
            "accept",
            vec!["text/calendar", "text/plain;q=0.9", "*/*;q=0.8"],
        ))
        .and(header("cookie", "PHPSESSID=s3ss10n; lang=de"))
        .and(header("referer", "https://portal.example.com/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/calendar; charset=utf-8")
                .set_body_string(CALENDAR),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/calendar/export?ics=1", server.uri());
    let response = fetcher()
        .get(&url, Some("https://portal.example.com/list"), &cookies())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(
        response.content_type.as_deref(),
        Some("text/calendar; charset=utf-8")
    );
    assert_eq!(response.body, CALENDAR.as_bytes());
}

#[test]
fn test_calendar_accept_lists_calendar_first() {
    let ranges: Vec<&str> = CALENDAR_ACCEPT.split(',').map(str::trim).collect();
    assert_eq!(ranges, vec!["text/calendar", "text/plain;q=0.9", "*/*;q=0.8"]);
}

#[tokio::test]
async fn test_get_reports_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let response = fetcher()
        .get(&format!("{}/calendar/export", server.uri()), None, &[])
        .await
        .unwrap();

    assert_eq!(response.status, 403);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_get_timeout_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(CALENDAR)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetcher = CookieFetcher::new(Duration::from_millis(200), None).unwrap();
    let err = fetcher
        .get(&format!("{}/slow", server.uri()), None, &[])
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "error: {err}");
}

#[tokio::test]
async fn test_connection_refused_is_request_failure() {
    let err = fetcher()
        .get("http://127.0.0.1:9/calendar/export", None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::RequestFailed(_)));
}

#[tokio::test]
async fn test_fetch_calendar_accepts_calendar_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendar/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CALENDAR))
        .mount(&server)
        .await;

    let session = HttpSession {
        fetcher: fetcher(),
        page_url: format!("{}/list", server.uri()),
    };
    let body = fetch_calendar(
        &session,
        &format!("{}/calendar/export", server.uri()),
        &NoopObserver,
    )
    .await
    .unwrap();

    assert_eq!(body.as_deref(), Some(CALENDAR.as_bytes()));
}

#[tokio::test]
async fn test_fetch_calendar_rejects_login_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/calendar")
                .set_body_string("<html><body>Bitte anmelden</body></html>"),
        )
        .mount(&server)
        .await;

    let session = HttpSession {
        fetcher: fetcher(),
        page_url: server.uri(),
    };
    let body = fetch_calendar(&session, &format!("{}/x", server.uri()), &NoopObserver)
        .await
        .unwrap();

    assert!(body.is_none());
}

#[tokio::test]
async fn test_fetch_calendar_rejects_error_status_with_calendar_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string(CALENDAR))
        .mount(&server)
        .await;

    let session = HttpSession {
        fetcher: fetcher(),
        page_url: server.uri(),
    };
    let body = fetch_calendar(&session, &format!("{}/x", server.uri()), &NoopObserver)
        .await
        .unwrap();

    assert!(body.is_none());
}

#[tokio::test]
async fn test_fetch_calendar_accepts_utf16_export() {
    let server = MockServer::start().await;

    let mut utf16 = vec![0xFF, 0xFE];
    for unit in CALENDAR.encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(utf16.clone()))
        .mount(&server)
        .await;

    let session = HttpSession {
        fetcher: fetcher(),
        page_url: server.uri(),
    };
    let body = fetch_calendar(&session, &format!("{}/x", server.uri()), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(body, Some(utf16));
}
