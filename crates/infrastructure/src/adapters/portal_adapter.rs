//! Portal adapter - Implements SchedulePort using integration_portal and integration_ics

use std::{fmt, sync::Arc};

use application::{ApplicationError, DecodedSchedule, SchedulePort};
use async_trait::async_trait;
use domain::{RetrievalOutcome, RetrievalRequest};
use integration_portal::{PortalClient, RetrievalObserver, TracingObserver};
use tracing::{debug, instrument};

use crate::config::AppConfig;

/// Adapter that retrieves exports through the browser-driven portal client
pub struct PortalScheduleAdapter {
    client: Arc<PortalClient>,
    observer: Arc<dyn RetrievalObserver>,
}

impl fmt::Debug for PortalScheduleAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalScheduleAdapter")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl PortalScheduleAdapter {
    /// Create an adapter that reports progress through `tracing`
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self {
            client,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the progress observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetrievalObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Build the portal client from application configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] if the portal or browser
    /// settings are unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApplicationError> {
        let client = PortalClient::new(config.portal.clone(), config.browser.clone())
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl SchedulePort for PortalScheduleAdapter {
    #[instrument(skip(self, request))]
    async fn retrieve(&self, request: RetrievalRequest) -> RetrievalOutcome {
        self.client.retrieve(&request, self.observer.as_ref()).await
    }

    fn decode(&self, raw: &[u8]) -> DecodedSchedule {
        let text = integration_ics::decode_calendar_bytes(raw);
        let events = integration_ics::decode(&text.text);
        debug!(
            encoding = %text.encoding,
            events = events.len(),
            "Decoded schedule export"
        );
        DecodedSchedule {
            events,
            encoding: text.encoding.to_string(),
        }
    }
}
