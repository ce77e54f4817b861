//! Schedule service
//!
//! Runs one retrieval, decodes the export and keeps the most recent
//! non-empty schedule in memory. Only one sync may run at a time.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use domain::{CalendarEvent, FailureKind, RetrievalOutcome, RetrievalRequest, TargetDate};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{error::ApplicationError, ports::SchedulePort};

/// A decoded schedule for one target date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSnapshot {
    pub target: TargetDate,
    pub events: Vec<CalendarEvent>,
    pub encoding: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// The export contained events
    Loaded(ScheduleSnapshot),
    /// The export was valid calendar data without any usable event
    Empty {
        target: TargetDate,
        encoding: String,
    },
}

impl SyncResult {
    pub fn events(&self) -> &[CalendarEvent] {
        match self {
            Self::Loaded(snapshot) => &snapshot.events,
            Self::Empty { .. } => &[],
        }
    }
}

/// Releases the in-flight flag when dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Schedule service for retrieving and caching the decoded schedule
pub struct ScheduleService {
    port: Arc<dyn SchedulePort>,
    in_flight: AtomicBool,
    last: RwLock<Option<ScheduleSnapshot>>,
}

impl fmt::Debug for ScheduleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleService")
            .field("in_flight", &self.is_syncing())
            .finish_non_exhaustive()
    }
}

impl ScheduleService {
    /// Create a new schedule service
    pub fn new(port: Arc<dyn SchedulePort>) -> Self {
        Self {
            port,
            in_flight: AtomicBool::new(false),
            last: RwLock::new(None),
        }
    }

    /// Whether a sync is currently running
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The most recent non-empty schedule
    pub fn last_snapshot(&self) -> Option<ScheduleSnapshot> {
        self.last.read().clone()
    }

    /// Retrieve and decode the schedule for `request`
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::SyncInProgress`] if another sync is running
    /// - [`ApplicationError::Retrieval`] if the portal retrieval failed
    #[instrument(skip(self, request), fields(username = %request.credentials.username()))]
    pub async fn sync(&self, request: RetrievalRequest) -> Result<SyncResult, ApplicationError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Sync requested while another is running");
            return Err(ApplicationError::SyncInProgress);
        }
        let _guard = InFlight(&self.in_flight);

        let target = request.validate().map_err(|e| ApplicationError::Retrieval {
            kind: FailureKind::Validation,
            message: FailureKind::Validation.user_message().to_string(),
            hint: Some(e.to_string()),
        })?;

        let raw = match self.port.retrieve(request).await {
            RetrievalOutcome::Success { raw_bytes } => raw_bytes,
            RetrievalOutcome::Failure {
                kind,
                message,
                hint,
            } => {
                warn!(%kind, "Schedule retrieval failed");
                return Err(ApplicationError::Retrieval {
                    kind,
                    message,
                    hint,
                });
            },
        };

        let decoded = self.port.decode(&raw);
        if decoded.events.is_empty() {
            info!(date = %target, encoding = %decoded.encoding, "Export contained no events");
            return Ok(SyncResult::Empty {
                target,
                encoding: decoded.encoding,
            });
        }

        let snapshot = ScheduleSnapshot {
            target,
            events: decoded.events,
            encoding: decoded.encoding,
            retrieved_at: Utc::now(),
        };
        info!(date = %target, events = snapshot.events.len(), "Schedule loaded");
        *self.last.write() = Some(snapshot.clone());

        Ok(SyncResult::Loaded(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use domain::Credentials;

    use super::*;
    use crate::ports::{DecodedSchedule, MockSchedulePort};

    fn request() -> RetrievalRequest {
        RetrievalRequest::new(Credentials::new("jane", "pw"), 2026, 3, 0)
    }

    fn event(summary: &str) -> CalendarEvent {
        CalendarEvent::new(summary, "2026-03-02T08:00:00Z", "2026-03-02T09:00:00Z", None)
    }

    fn decoded(events: Vec<CalendarEvent>) -> DecodedSchedule {
        DecodedSchedule {
            events,
            encoding: "UTF-8".to_string(),
        }
    }

    #[tokio::test]
    async fn loaded_schedule_is_kept() {
        let mut port = MockSchedulePort::new();
        port.expect_retrieve()
            .times(1)
            .returning(|_| RetrievalOutcome::success(b"BEGIN:VCALENDAR".to_vec()));
        port.expect_decode()
            .times(1)
            .returning(|_| decoded(vec![event("Mathe")]));

        let service = ScheduleService::new(Arc::new(port));
        let result = service.sync(request()).await.unwrap();

        assert_eq!(result.events().len(), 1);
        let snapshot = service.last_snapshot().unwrap();
        assert_eq!(snapshot.events[0].summary, "Mathe");
        assert_eq!(snapshot.target, TargetDate::month(2026, 3).unwrap());
        assert!(!service.is_syncing());
    }

    #[tokio::test]
    async fn empty_export_keeps_previous_snapshot() {
        let mut port = MockSchedulePort::new();
        port.expect_retrieve()
            .returning(|_| RetrievalOutcome::success(b"BEGIN:VCALENDAR".to_vec()));
        let mut calls = 0;
        port.expect_decode().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                decoded(vec![event("Mathe")])
            } else {
                decoded(Vec::new())
            }
        });

        let service = ScheduleService::new(Arc::new(port));
        service.sync(request()).await.unwrap();
        let second = service.sync(request()).await.unwrap();

        assert!(matches!(second, SyncResult::Empty { .. }));
        assert!(second.events().is_empty());
        assert_eq!(service.last_snapshot().unwrap().events.len(), 1);
    }

    #[tokio::test]
    async fn retrieval_failure_is_mapped() {
        let mut port = MockSchedulePort::new();
        port.expect_retrieve()
            .returning(|_| RetrievalOutcome::failure(FailureKind::InvalidCredentials));
        port.expect_decode().never();

        let service = ScheduleService::new(Arc::new(port));
        let err = service.sync(request()).await.unwrap_err();

        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidCredentials));
        assert!(service.last_snapshot().is_none());
        assert!(!service.is_syncing());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_port() {
        let mut port = MockSchedulePort::new();
        port.expect_retrieve().never();

        let service = ScheduleService::new(Arc::new(port));
        let bad = RetrievalRequest::new(Credentials::new("jane", "pw"), 2026, 0, 0);
        let err = service.sync(bad).await.unwrap_err();

        assert_eq!(err.failure_kind(), Some(FailureKind::Validation));
        assert!(!service.is_syncing());
    }

    struct SlowPort;

    #[async_trait::async_trait]
    impl SchedulePort for SlowPort {
        async fn retrieve(&self, _request: RetrievalRequest) -> RetrievalOutcome {
            tokio::time::sleep(Duration::from_millis(100)).await;
            RetrievalOutcome::success(b"BEGIN:VCALENDAR".to_vec())
        }

        fn decode(&self, _raw: &[u8]) -> DecodedSchedule {
            decoded(vec![event("Mathe")])
        }
    }

    #[tokio::test]
    async fn overlapping_sync_is_rejected() {
        let service = ScheduleService::new(Arc::new(SlowPort));

        let (first, second) = tokio::join!(service.sync(request()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service.sync(request()).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(ApplicationError::SyncInProgress)));
        assert!(!service.is_syncing());
    }
}
