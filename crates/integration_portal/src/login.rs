//! Login form heuristics
//!
//! The portal's login markup has changed several times, so fields are
//! located through ordered matcher lists where the first hit wins.

use std::time::Duration;

use domain::Credentials;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::PortalError,
    observer::{RetrievalObserver, events},
    session::{ElementMatcher, PortalSession},
};

/// Username input, most specific first
pub const USERNAME_FIELD: &[ElementMatcher] = &[
    ElementMatcher::Css(r#"input[placeholder*="Benutzer" i]"#),
    ElementMatcher::Css(r#"input[placeholder*="user" i]"#),
    ElementMatcher::Css(r#"input[name*="login" i]"#),
    ElementMatcher::Css(r#"input[name*="user" i]"#),
    ElementMatcher::Css(r#"input[type="text"]"#),
];

/// Password input
pub const PASSWORD_FIELD: &[ElementMatcher] = &[
    ElementMatcher::Css(r#"input[placeholder*="Passwort" i]"#),
    ElementMatcher::Css(r#"input[placeholder*="password" i]"#),
    ElementMatcher::Css(r#"input[type="password"]"#),
];

/// Submit control
pub const SUBMIT_CONTROL: &[ElementMatcher] = &[
    ElementMatcher::ButtonText("Anmelden"),
    ElementMatcher::Css(r#"[type="submit"]"#),
];

/// Elements whose presence after submitting means the login was rejected
///
/// The generic text input is left out; logged-in pages have search boxes.
pub const LOGIN_FORM_MARKERS: &[ElementMatcher] = &[
    ElementMatcher::Css(r#"input[type="password"]"#),
    ElementMatcher::Css(r#"input[name*="login" i]"#),
    ElementMatcher::Css(r#"input[name*="user" i]"#),
    ElementMatcher::ButtonText("Anmelden"),
];

/// Result of a login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The form went away after submitting
    Authenticated,
    /// No login form was shown; the session was already authenticated
    AlreadyAuthenticated,
    /// The form is still there after submitting
    Rejected,
}

/// First matcher in `matchers` that finds an element
pub async fn first_match(
    session: &dyn PortalSession,
    matchers: &[ElementMatcher],
) -> Result<Option<ElementMatcher>, PortalError> {
    for matcher in matchers {
        if session.exists(matcher).await? {
            return Ok(Some(*matcher));
        }
    }
    Ok(None)
}

/// Fill and submit the login form on the current page
///
/// A page without a password field is taken as an already authenticated
/// session, which happens with a persistent browser profile.
#[instrument(skip(session, credentials, observer), fields(username = %credentials.username()))]
pub async fn login(
    session: &dyn PortalSession,
    credentials: &Credentials,
    observer: &dyn RetrievalObserver,
    settle_timeout: Duration,
) -> Result<LoginOutcome, PortalError> {
    let Some(password_field) = first_match(session, PASSWORD_FIELD).await? else {
        info!("No login form on landing page, continuing with existing session");
        observer.log(events::LOGIN_SKIPPED, "no password field");
        return Ok(LoginOutcome::AlreadyAuthenticated);
    };

    let username_field = first_match(session, USERNAME_FIELD)
        .await?
        .ok_or_else(|| PortalError::LoginForm("no username field".to_string()))?;
    let submit = first_match(session, SUBMIT_CONTROL)
        .await?
        .ok_or_else(|| PortalError::LoginForm("no submit control".to_string()))?;

    debug!(%username_field, %password_field, %submit, "Login form located");

    session.fill(&username_field, credentials.username()).await?;
    session
        .fill(&password_field, credentials.expose_password())
        .await?;
    session.click(&submit).await?;

    let wait = session.wait_for_navigation(settle_timeout).await;
    debug!(?wait, "Login submitted");

    if let Some(marker) = first_match(session, LOGIN_FORM_MARKERS).await? {
        warn!(%marker, "Login form still present after submit");
        observer.log(events::LOGIN_FAILURE, &marker.to_string());
        return Ok(LoginOutcome::Rejected);
    }

    observer.log(events::LOGIN_SUCCESS, credentials.username());
    Ok(LoginOutcome::Authenticated)
}
