//! Export fallback chain
//!
//! The export endpoint only answers when the right session tokens are on
//! the URL, and which page mints them has varied. Strategies are tried in a
//! fixed order and the first calendar body wins. Month-scoped URLs are
//! always tried before day-scoped ones.

use std::{
    fmt,
    time::{Duration, Instant},
};

use domain::{SessionTokens, TargetDate};
use tracing::{debug, info, instrument};

use crate::{
    discovery::LinkDiscovery,
    error::PortalError,
    fetch::fetch_calendar,
    observer::{RetrievalObserver, events},
    session::PortalSession,
};

/// Everything a step needs; shared read-only across the chain
#[derive(Clone, Copy)]
pub struct ChainContext<'a> {
    pub session: &'a dyn PortalSession,
    pub discovery: &'a LinkDiscovery,
    pub target: TargetDate,
    pub observer: &'a dyn RetrievalObserver,
    pub deadline: Option<Instant>,
    pub settle_timeout: Duration,
}

impl fmt::Debug for ChainContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainContext")
            .field("target", &self.target)
            .field("deadline", &self.deadline)
            .field("settle_timeout", &self.settle_timeout)
            .finish_non_exhaustive()
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Calendar bytes; the chain stops
    Found(Vec<u8>),
    /// Nothing here; try the next step
    Continue,
}

/// Retrieval strategies in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStep {
    /// Visit list, schedule and index pages; use their tokens and links
    BootstrapNavigation,
    /// Build the export URL from the path convention
    DirectConstruction,
    /// Read the export link off the calendar index page
    IndexDiscovery,
    /// Take the first export anchor on the current page
    DomAnchorDiscovery,
}

impl ChainStep {
    pub const ALL: [Self; 4] = [
        Self::BootstrapNavigation,
        Self::DirectConstruction,
        Self::IndexDiscovery,
        Self::DomAnchorDiscovery,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::BootstrapNavigation => "bootstrap_navigation",
            Self::DirectConstruction => "direct_construction",
            Self::IndexDiscovery => "index_discovery",
            Self::DomAnchorDiscovery => "dom_anchor_discovery",
        }
    }

    /// Run this step
    ///
    /// `tried` holds every URL fetched so far in the chain; the step skips
    /// those and appends the ones it fetches.
    pub async fn run(
        self,
        ctx: &ChainContext<'_>,
        tried: &mut Vec<String>,
    ) -> Result<StepOutcome, PortalError> {
        match self {
            Self::BootstrapNavigation => bootstrap_navigation(ctx, tried).await,
            Self::DirectConstruction => direct_construction(ctx, tried).await,
            Self::IndexDiscovery => index_discovery(ctx, tried).await,
            Self::DomAnchorDiscovery => dom_anchor_discovery(ctx, tried).await,
        }
    }
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run every step in order until one finds the export
///
/// Returns `Ok(None)` when all steps miss.
///
/// # Errors
///
/// Returns [`PortalError::DeadlineExceeded`] when the caller's deadline
/// passes between steps, and propagates transport errors.
#[instrument(skip(ctx), fields(target = %ctx.target))]
pub async fn run_chain(ctx: &ChainContext<'_>) -> Result<Option<Vec<u8>>, PortalError> {
    let mut tried = Vec::new();
    for step in ChainStep::ALL {
        if ctx.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(PortalError::DeadlineExceeded);
        }

        ctx.observer.log(events::STEP_START, step.name());
        debug!(%step, "Running fallback step");

        if let StepOutcome::Found(bytes) = step.run(ctx, &mut tried).await? {
            info!(%step, bytes = bytes.len(), "Calendar export found");
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

async fn navigate(ctx: &ChainContext<'_>, url: &str) -> Result<(), PortalError> {
    ctx.observer.log(events::NAVIGATION_START, url);
    ctx.session.goto(url).await?;
    let wait = ctx.session.wait_for_network_idle(ctx.settle_timeout).await;
    ctx.observer.log(events::NAVIGATION_END, &format!("{url} ({wait:?})"));
    Ok(())
}

/// Try `urls` in order, skipping ones already tried in this chain
async fn try_urls(
    ctx: &ChainContext<'_>,
    urls: impl IntoIterator<Item = String>,
    tried: &mut Vec<String>,
) -> Result<StepOutcome, PortalError> {
    for url in urls {
        if tried.contains(&url) {
            continue;
        }
        tried.push(url.clone());
        if let Some(bytes) = fetch_calendar(ctx.session, &url, ctx.observer).await? {
            return Ok(StepOutcome::Found(bytes));
        }
    }
    Ok(StepOutcome::Continue)
}

fn tokenized_urls(ctx: &ChainContext<'_>, tokens: &SessionTokens) -> Result<Vec<String>, PortalError> {
    ctx.target
        .scopes()
        .into_iter()
        .map(|scope| {
            ctx.discovery
                .build_export_url(tokens, scope)
                .map(domain::CandidateUrl::into_inner)
        })
        .collect()
}

fn restamped_urls(ctx: &ChainContext<'_>, href: &str) -> Result<Vec<String>, PortalError> {
    ctx.target
        .scopes()
        .into_iter()
        .map(|scope| {
            ctx.discovery
                .restamp_href(href, scope)
                .map(domain::CandidateUrl::into_inner)
        })
        .collect()
}

async fn bootstrap_navigation(
    ctx: &ChainContext<'_>,
    tried: &mut Vec<String>,
) -> Result<StepOutcome, PortalError> {
    for page in ctx.discovery.bootstrap_urls()? {
        navigate(ctx, page.as_str()).await?;

        let current = ctx.session.current_url().await?;
        let tokens = ctx.discovery.find_session_tokens(&current);
        if !tokens.is_empty() {
            debug!(tokens = ?tokens, page = %page, "Session tokens on bootstrap page");
            let urls = tokenized_urls(ctx, &tokens)?;
            if let found @ StepOutcome::Found(_) = try_urls(ctx, urls, tried).await? {
                return Ok(found);
            }
        }

        let html = ctx.session.content().await?;
        for href in ctx.discovery.find_export_urls(&html) {
            let urls = restamped_urls(ctx, &href)?;
            if let found @ StepOutcome::Found(_) = try_urls(ctx, urls, tried).await? {
                return Ok(found);
            }
        }
    }

    Ok(StepOutcome::Continue)
}

async fn direct_construction(
    ctx: &ChainContext<'_>,
    tried: &mut Vec<String>,
) -> Result<StepOutcome, PortalError> {
    let current = ctx.session.current_url().await?;
    let tokens = ctx.discovery.find_session_tokens(&current);
    let urls = tokenized_urls(ctx, &tokens)?;
    try_urls(ctx, urls, tried).await
}

async fn index_discovery(
    ctx: &ChainContext<'_>,
    tried: &mut Vec<String>,
) -> Result<StepOutcome, PortalError> {
    let index = ctx.discovery.calendar_index_url()?;
    navigate(ctx, index.as_str()).await?;
    let html = ctx.session.content().await?;

    if let Some(href) = ctx.discovery.find_export_url(&html) {
        let urls = restamped_urls(ctx, &href)?;
        if let found @ StepOutcome::Found(_) = try_urls(ctx, urls, tried).await? {
            return Ok(found);
        }
    }

    match ctx.discovery.find_single_link(&html) {
        Some(href) => {
            let url = ctx.discovery.resolve(&href)?;
            try_urls(ctx, [url.to_string()], tried).await
        },
        None => Ok(StepOutcome::Continue),
    }
}

async fn dom_anchor_discovery(
    ctx: &ChainContext<'_>,
    tried: &mut Vec<String>,
) -> Result<StepOutcome, PortalError> {
    let anchors = ctx.session.anchors().await?;
    match ctx.discovery.find_export_anchor(&anchors) {
        Some(href) => {
            let urls = restamped_urls(ctx, &href)?;
            try_urls(ctx, urls, tried).await
        },
        None => Ok(StepOutcome::Continue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(
            ChainStep::ALL.map(ChainStep::name),
            [
                "bootstrap_navigation",
                "direct_construction",
                "index_discovery",
                "dom_anchor_discovery"
            ]
        );
    }
}
