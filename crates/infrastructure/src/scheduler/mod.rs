//! Cron-based re-sync of the schedule
//!
//! Wraps `tokio-cron-scheduler` so the schedule service is re-run on a cron
//! expression. A tick that fires while a sync is still running is skipped,
//! never queued. Cron expressions are evaluated in UTC.

use std::{
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Instant,
};

use application::{ApplicationError, ScheduleService, SyncResult};
use chrono::{DateTime, Utc};
use domain::{FailureKind, RetrievalRequest};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, instrument, warn};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    /// Scheduler failed to start
    #[error("Scheduler failed to start: {0}")]
    StartupFailed(String),

    /// Internal scheduler error
    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Predefined cron expressions (6 fields: sec min hour day month weekday)
pub mod schedules {
    /// Every 15 minutes
    pub const EVERY_15_MINUTES: &str = "0 */15 * * * *";
    /// Every hour
    pub const HOURLY: &str = "0 0 * * * *";
    /// Every 6 hours
    pub const EVERY_6_HOURS: &str = "0 0 */6 * * *";
    /// Every day at 6 AM
    pub const DAILY_6AM: &str = "0 0 6 * * *";
}

/// Builds the request for each tick, so the target date can follow the clock
pub type RequestFactory = Arc<dyn Fn() -> RetrievalRequest + Send + Sync>;

/// What one sync attempt ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Events were decoded and stored
    Loaded { events: usize },
    /// The export was valid but had no events
    Empty,
    /// A previous sync was still running
    Skipped,
    /// Retrieval or decoding failed
    Failed {
        kind: Option<FailureKind>,
        message: String,
    },
}

/// Sync completion event sent to the event channel
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub outcome: SyncOutcome,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Counters across all ticks
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub success_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct SyncCounters {
    success: AtomicU64,
    failure: AtomicU64,
    skipped: AtomicU64,
    last_success: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl SyncCounters {
    fn record(&self, outcome: &SyncOutcome, at: DateTime<Utc>) {
        match outcome {
            SyncOutcome::Loaded { .. } | SyncOutcome::Empty => {
                self.success.fetch_add(1, Ordering::Relaxed);
                *self.last_success.write() = Some(at);
            },
            SyncOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            },
            SyncOutcome::Failed { message, .. } => {
                self.failure.fetch_add(1, Ordering::Relaxed);
                *self.last_error.write() = Some(message.clone());
            },
        }
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            success_count: self.success.load(Ordering::Relaxed),
            failure_count: self.failure.load(Ordering::Relaxed),
            skipped_count: self.skipped.load(Ordering::Relaxed),
            last_success: *self.last_success.read(),
            last_error: self.last_error.read().clone(),
        }
    }
}

/// Periodic schedule sync
pub struct SyncScheduler {
    scheduler: AsyncMutex<JobScheduler>,
    running: AtomicBool,
    counters: Arc<SyncCounters>,
    event_tx: mpsc::Sender<SyncEvent>,
    event_rx: RwLock<Option<mpsc::Receiver<SyncEvent>>>,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("running", &self.is_running())
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

const EVENT_BUFFER_SIZE: usize = 32;

impl SyncScheduler {
    /// Create a stopped scheduler
    #[instrument(skip_all)]
    pub async fn new() -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        Ok(Self {
            scheduler: AsyncMutex::new(scheduler),
            running: AtomicBool::new(false),
            counters: Arc::new(SyncCounters::default()),
            event_tx,
            event_rx: RwLock::new(Some(event_rx)),
        })
    }

    /// Start firing scheduled jobs
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.running.load(Ordering::Relaxed) {
            debug!("Scheduler already running");
            return Ok(());
        }

        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;
        self.running.store(true, Ordering::Relaxed);
        info!("Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler. It cannot be restarted afterwards.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.load(Ordering::Relaxed) {
            debug!("Scheduler already stopped");
            return Ok(());
        }

        self.scheduler.lock().await.shutdown().await?;
        self.running.store(false, Ordering::Relaxed);
        info!("Sync scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.write().take()
    }

    /// Re-run `service.sync` on `cron_expression`
    #[instrument(skip(self, service, requests))]
    pub async fn schedule_sync(
        &self,
        cron_expression: &str,
        service: Arc<ScheduleService>,
        requests: RequestFactory,
    ) -> Result<(), SchedulerError> {
        cron::Schedule::from_str(cron_expression).map_err(|e| {
            SchedulerError::InvalidCronExpression(format!("{cron_expression}: {e}"))
        })?;

        let counters = Arc::clone(&self.counters);
        let event_tx = self.event_tx.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let service = Arc::clone(&service);
            let requests = Arc::clone(&requests);
            let counters = Arc::clone(&counters);
            let event_tx = event_tx.clone();

            Box::pin(async move {
                let event = run_tick(&service, requests(), &counters).await;
                let _ = event_tx.try_send(event);
            })
        })
        .map_err(|e| SchedulerError::InvalidCronExpression(e.to_string()))?;

        self.scheduler.lock().await.add(job).await?;
        info!(cron = %cron_expression, "Schedule sync registered");
        Ok(())
    }

    /// Run one sync right now, outside the cron schedule
    pub async fn run_now(&self, service: &ScheduleService, request: RetrievalRequest) -> SyncEvent {
        let event = run_tick(service, request, &self.counters).await;
        let _ = self.event_tx.try_send(event.clone());
        event
    }
}

async fn run_tick(
    service: &ScheduleService,
    request: RetrievalRequest,
    counters: &SyncCounters,
) -> SyncEvent {
    let start = Instant::now();

    let outcome = if service.is_syncing() {
        debug!("Previous sync still running, skipping tick");
        SyncOutcome::Skipped
    } else {
        match service.sync(request).await {
            Ok(SyncResult::Loaded(snapshot)) => {
                info!(
                    date = %snapshot.target,
                    events = snapshot.events.len(),
                    "Scheduled sync completed"
                );
                SyncOutcome::Loaded {
                    events: snapshot.events.len(),
                }
            },
            Ok(SyncResult::Empty { target, .. }) => {
                info!(date = %target, "Scheduled sync found no events");
                SyncOutcome::Empty
            },
            Err(ApplicationError::SyncInProgress) => {
                debug!("Sync started concurrently, skipping tick");
                SyncOutcome::Skipped
            },
            Err(e) => {
                if e.is_retryable() {
                    warn!(error = %e, "Scheduled sync failed, will retry on next tick");
                } else {
                    error!(error = %e, "Scheduled sync failed");
                }
                SyncOutcome::Failed {
                    kind: e.failure_kind(),
                    message: e.to_string(),
                }
            },
        }
    };

    let completed_at = Utc::now();
    counters.record(&outcome, completed_at);

    SyncEvent {
        outcome,
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        completed_at,
    }
}
