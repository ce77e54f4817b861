//! Portal adapter and schedule service wiring without a real browser

use std::{sync::Arc, time::Duration};

use application::{ApplicationError, ScheduleService};
use async_trait::async_trait;
use domain::{Credentials, FailureKind, RetrievalRequest};
use infrastructure::{PortalScheduleAdapter, SyncOutcome, SyncScheduler};
use integration_portal::{
    NoopObserver, PortalClient, PortalConfig, PortalError, PortalSession, SessionLauncher,
};

struct CrashingLauncher;

#[async_trait]
impl SessionLauncher for CrashingLauncher {
    async fn launch(&self, _timeout: Duration) -> Result<Box<dyn PortalSession>, PortalError> {
        Err(PortalError::Browser("chromium exited".to_string()))
    }
}

fn service() -> Arc<ScheduleService> {
    let client = PortalClient::with_launcher(
        PortalConfig::new("https://portal.example.com"),
        Arc::new(CrashingLauncher),
    )
    .unwrap();
    let adapter =
        PortalScheduleAdapter::new(Arc::new(client)).with_observer(Arc::new(NoopObserver));
    Arc::new(ScheduleService::new(Arc::new(adapter)))
}

fn request() -> RetrievalRequest {
    RetrievalRequest::new(Credentials::new("jane", "secret"), 2024, 3, 0)
}

#[tokio::test]
async fn browser_crash_surfaces_as_unexpected() {
    let err = service().sync(request()).await.unwrap_err();

    match err {
        ApplicationError::Retrieval { kind, hint, .. } => {
            assert_eq!(kind, FailureKind::Unexpected);
            assert!(hint.unwrap().contains("chromium exited"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn invalid_request_never_reaches_browser() {
    let request = RetrievalRequest::new(Credentials::new("", "secret"), 2024, 13, 0);
    let err = service().sync(request).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::Validation));
}

#[tokio::test]
async fn scheduler_records_adapter_failure() {
    let scheduler = SyncScheduler::new().await.unwrap();
    let service = service();

    let event = scheduler.run_now(&service, request()).await;
    assert!(matches!(
        event.outcome,
        SyncOutcome::Failed {
            kind: Some(FailureKind::Unexpected),
            ..
        }
    ));
    assert_eq!(scheduler.stats().failure_count, 1);
    assert!(service.last_snapshot().is_none());
}
