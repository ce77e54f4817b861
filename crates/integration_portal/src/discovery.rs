//! Export link and session token discovery
//!
//! The portal never documents its export endpoint. Links to it show up in
//! page HTML with entity-encoded query strings, and the parameters that make
//! them work are session tokens minted on specific pages. This module finds
//! those links and tokens and rebuilds export URLs for a target date.

use std::sync::LazyLock;

use domain::{CandidateUrl, SessionTokens, TargetDate};
use regex::Regex;
use url::Url;

use crate::{config::PortalConfig, error::PortalError};

static HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Infallible with a valid static pattern
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Failed to compile href pattern")
});

const DATE_PARAMS: [&str; 4] = ["ics", "month", "year", "day"];

/// Decode the handful of entities the portal uses inside attribute values
pub fn decode_entities(html: &str) -> String {
    html.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Every `href` value in `html`, entity-decoded, in document order
pub fn hrefs(html: &str) -> Vec<String> {
    HREF_PATTERN
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| decode_entities(m.as_str()).trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Whether a query string (or full href) sets `ics=1`
fn has_ics_flag(href: &str) -> bool {
    query_pairs(href).any(|(name, value)| name == "ics" && value == "1")
}

fn query_pairs(href: &str) -> impl Iterator<Item = (&str, &str)> {
    let query = href
        .split_once('?')
        .map_or("", |(_, q)| q)
        .split('#')
        .next()
        .unwrap_or_default();
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// Link and token discovery bound to one portal's conventions
#[derive(Debug, Clone)]
pub struct LinkDiscovery {
    base: Url,
    export_path: String,
    calendar_index_path: String,
    bootstrap_paths: Vec<String>,
    token_patterns: Vec<Regex>,
}

impl LinkDiscovery {
    /// Compile discovery rules from the portal configuration
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::ConfigurationError`] for an invalid base URL or
    /// token pattern.
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        config.validate().map_err(PortalError::ConfigurationError)?;

        let base = Url::parse(&config.base_url)?;
        let token_patterns = config
            .token_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PortalError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            base,
            export_path: config.export_path.clone(),
            calendar_index_path: config.calendar_index_path.clone(),
            bootstrap_paths: config.bootstrap_paths.clone(),
            token_patterns,
        })
    }

    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a page path or href against the portal base
    pub fn resolve(&self, href: &str) -> Result<Url, PortalError> {
        Ok(self.base.join(&decode_entities(href))?)
    }

    /// Bootstrap pages, resolved, in probing order
    pub fn bootstrap_urls(&self) -> Result<Vec<Url>, PortalError> {
        self.bootstrap_paths.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn calendar_index_url(&self) -> Result<Url, PortalError> {
        self.resolve(&self.calendar_index_path)
    }

    fn is_token_name(&self, name: &str) -> bool {
        self.token_patterns.iter().any(|p| p.is_match(name))
    }

    fn is_export_href(&self, href: &str) -> bool {
        href.contains(&self.export_path)
    }

    /// Whether `href` resolves to the portal's own origin
    ///
    /// Export requests carry the portal session, so links to other hosts
    /// are never followed.
    pub fn is_same_origin(&self, href: &str) -> bool {
        self.base
            .join(href)
            .is_ok_and(|url| url.origin() == self.base.origin())
    }

    fn is_portal_export(&self, href: &str) -> bool {
        self.is_export_href(href) && self.is_same_origin(href)
    }

    fn carries_token(&self, href: &str) -> bool {
        query_pairs(href).any(|(name, _)| self.is_token_name(name))
    }

    /// Best export link in `html`: contains the export path and `ics=1`,
    /// preferring one that carries a session token
    pub fn find_export_url(&self, html: &str) -> Option<String> {
        let candidates: Vec<String> = hrefs(html)
            .into_iter()
            .filter(|href| self.is_portal_export(href) && has_ics_flag(href))
            .collect();

        let index = candidates
            .iter()
            .position(|href| self.carries_token(href))
            .unwrap_or(0);
        candidates.into_iter().nth(index)
    }

    /// Every link containing the export path, deduplicated, in document order
    pub fn find_export_urls(&self, html: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for href in hrefs(html) {
            if self.is_portal_export(&href) && !found.contains(&href) {
                found.push(href);
            }
        }
        found
    }

    /// Narrow single-link fallback: first link ending in `.ics` or
    /// containing the export path
    pub fn find_single_link(&self, html: &str) -> Option<String> {
        hrefs(html).into_iter().find(|href| {
            let path = href.split(['?', '#']).next().unwrap_or_default();
            (path.to_ascii_lowercase().ends_with(".ics") || self.is_export_href(href))
                && self.is_same_origin(href)
        })
    }

    /// First anchor href pointing at the export with `ics=1`
    pub fn find_export_anchor(&self, anchors: &[String]) -> Option<String> {
        anchors
            .iter()
            .map(|href| decode_entities(href))
            .find(|href| self.is_portal_export(href) && has_ics_flag(href))
    }

    /// Session token parameters present in `url`
    pub fn find_session_tokens(&self, url: &str) -> SessionTokens {
        let mut tokens = SessionTokens::default();
        let Ok(parsed) = self.base.join(url) else {
            return tokens;
        };
        for (name, value) in parsed.query_pairs() {
            if self.is_token_name(&name) {
                tokens.insert(name.into_owned(), value.into_owned());
            }
        }
        tokens
    }

    /// Export URL built from the path convention plus session tokens
    pub fn build_export_url(
        &self,
        tokens: &SessionTokens,
        target: TargetDate,
    ) -> Result<CandidateUrl, PortalError> {
        let mut url = self.base.join(&self.export_path)?;
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (name, value) in tokens.iter() {
                query.append_pair(name, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        restamp(&url, target)
    }

    /// Resolve `href` and stamp it with the target date
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidUrl`] when `href` does not resolve or
    /// points at another origin.
    pub fn restamp_href(&self, href: &str, target: TargetDate) -> Result<CandidateUrl, PortalError> {
        let url = self.resolve(href)?;
        if url.origin() != self.base.origin() {
            return Err(PortalError::InvalidUrl(format!(
                "{} is outside the portal",
                url.origin().ascii_serialization()
            )));
        }
        restamp(&url, target)
    }
}

/// Set `ics=1`, `month`, `year` and `day` on `url`, keeping other parameters
/// in their original order
///
/// `day` is empty for a month-scoped target.
pub fn restamp(url: &Url, target: TargetDate) -> Result<CandidateUrl, PortalError> {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !DATE_PARAMS.contains(&name.as_ref()))
        .map(|(n, v)| (n.into_owned(), v.into_owned()))
        .collect();

    let mut stamped = url.clone();
    stamped
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("ics", "1")
        .append_pair("month", &target.month_number().to_string())
        .append_pair("year", &target.year().to_string())
        .append_pair("day", &target.day_param());

    CandidateUrl::new(stamped.as_str()).map_err(|e| PortalError::InvalidUrl(e.to_string()))
}
