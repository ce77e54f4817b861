//! Retrieval orchestrator

use std::{fmt, sync::Arc, time::Duration};

use domain::{FailureKind, RetrievalOutcome, RetrievalRequest, TargetDate};
use tracing::{error, info, instrument, warn};

use crate::{
    browser::{BrowserSettings, ChromiumLauncher},
    chain::{ChainContext, run_chain},
    config::PortalConfig,
    discovery::LinkDiscovery,
    error::PortalError,
    login::{LoginOutcome, login},
    observer::{RetrievalObserver, events},
    session::{PortalSession, SessionLauncher},
};

/// Outcome of a session that did not error
enum Drive {
    Found(Vec<u8>),
    Rejected,
    Exhausted,
}

/// Logs into the portal and retrieves the calendar export
///
/// Each call runs in its own browser session which is closed before the
/// call returns. Callers that may overlap must serialize calls for the same
/// account themselves.
pub struct PortalClient {
    config: PortalConfig,
    discovery: LinkDiscovery,
    launcher: Arc<dyn SessionLauncher>,
}

impl fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl PortalClient {
    /// Create a client that drives Chromium
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::ConfigurationError`] for invalid configuration.
    pub fn new(config: PortalConfig, browser: BrowserSettings) -> Result<Self, PortalError> {
        let launcher = ChromiumLauncher::new(browser)?;
        Self::with_launcher(config, Arc::new(launcher))
    }

    /// Create a client with a custom session launcher
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::ConfigurationError`] for invalid configuration.
    pub fn with_launcher(
        config: PortalConfig,
        launcher: Arc<dyn SessionLauncher>,
    ) -> Result<Self, PortalError> {
        let discovery = LinkDiscovery::new(&config)?;
        Ok(Self {
            config,
            discovery,
            launcher,
        })
    }

    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Retrieve the export for the requested date
    ///
    /// Never returns an error: every failure is folded into
    /// [`RetrievalOutcome::Failure`].
    #[instrument(skip(self, request, observer), fields(username = %request.credentials.username()))]
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
        observer: &dyn RetrievalObserver,
    ) -> RetrievalOutcome {
        let target = match request.validate() {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "Rejected invalid retrieval request");
                let outcome =
                    RetrievalOutcome::failure_with_hint(FailureKind::Validation, e.to_string());
                return finish(observer, outcome);
            },
        };

        let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());

        observer.status("Starting browser");
        let session = match self.launcher.launch(timeout).await {
            Ok(session) => session,
            Err(e) => return finish(observer, error_outcome(&e)),
        };

        let result = self
            .drive(session.as_ref(), request, target, timeout, observer)
            .await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser session");
        }

        let outcome = match result {
            Ok(Drive::Found(bytes)) => RetrievalOutcome::success(bytes),
            Ok(Drive::Rejected) => RetrievalOutcome::failure(FailureKind::InvalidCredentials),
            Ok(Drive::Exhausted) => RetrievalOutcome::failure(FailureKind::NotFound),
            Err(e) => error_outcome(&e),
        };
        finish(observer, outcome)
    }

    async fn drive(
        &self,
        session: &dyn PortalSession,
        request: &RetrievalRequest,
        target: TargetDate,
        timeout: Duration,
        observer: &dyn RetrievalObserver,
    ) -> Result<Drive, PortalError> {
        let landing = self.discovery.resolve(&self.config.login_path)?;

        observer.status("Opening portal");
        observer.log(events::NAVIGATION_START, landing.as_str());
        session.goto(landing.as_str()).await?;
        let wait = session.wait_for_network_idle(timeout).await;
        observer.log(events::NAVIGATION_END, &format!("{landing} ({wait:?})"));

        observer.status("Logging in");
        if login(session, &request.credentials, observer, timeout).await? == LoginOutcome::Rejected {
            return Ok(Drive::Rejected);
        }

        observer.status("Loading calendar");
        let ctx = ChainContext {
            session,
            discovery: &self.discovery,
            target,
            observer,
            deadline: request.deadline,
            settle_timeout: timeout,
        };

        Ok(run_chain(&ctx)
            .await?
            .map_or(Drive::Exhausted, Drive::Found))
    }
}

fn error_outcome(err: &PortalError) -> RetrievalOutcome {
    if err.is_timeout() {
        RetrievalOutcome::failure_with_hint(FailureKind::Timeout, err.to_string())
    } else {
        error!(error = %err, "Retrieval failed");
        RetrievalOutcome::failure_with_hint(FailureKind::Unexpected, err.to_string())
    }
}

fn finish(observer: &dyn RetrievalObserver, outcome: RetrievalOutcome) -> RetrievalOutcome {
    match &outcome {
        RetrievalOutcome::Success { raw_bytes } => {
            info!(bytes = raw_bytes.len(), "Calendar retrieved");
            observer.status("Calendar loaded");
            observer.log(events::RETRIEVAL_SUCCESS, &raw_bytes.len().to_string());
        },
        RetrievalOutcome::Failure { kind, message, hint } => {
            info!(%kind, hint = hint.as_deref().unwrap_or("-"), "Calendar retrieval failed");
            observer.status(message);
            observer.log(events::RETRIEVAL_FAILURE, &kind.to_string());
        },
    }
    outcome
}
