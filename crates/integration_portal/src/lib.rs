#![forbid(unsafe_code)]
//! School portal integration for schedsync
//!
//! The portal has no API. [`PortalClient`] drives a headless browser through
//! the login form and then hunts for the calendar export, which sits behind
//! an undocumented, token-protected endpoint.
//!
//! # Architecture
//!
//! - [`session::PortalSession`] is the narrow browser surface the flow needs;
//!   [`browser::ChromiumSession`] implements it with `chromiumoxide`.
//! - [`login`] holds the form heuristics as ordered matcher lists.
//! - [`chain`] runs the fallback strategies in order, first hit wins.
//! - [`fetch`] downloads candidates with the session cookies and keeps only
//!   bodies that sniff as iCalendar.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain::{Credentials, RetrievalRequest};
//! use integration_portal::{BrowserSettings, PortalClient, PortalConfig, TracingObserver};
//!
//! let client = PortalClient::new(
//!     PortalConfig::new("https://portal.example.com"),
//!     BrowserSettings::default(),
//! )?;
//! let request = RetrievalRequest::new(Credentials::new("jane", "secret"), 2026, 3, 0);
//! let outcome = client.retrieve(&request, &TracingObserver).await;
//! ```

pub mod browser;
pub mod chain;
mod client;
mod config;
pub mod discovery;
mod error;
pub mod fetch;
pub mod login;
pub mod observer;
pub mod session;

pub use browser::{BrowserSettings, ChromiumLauncher, ChromiumSession};
pub use client::PortalClient;
pub use config::PortalConfig;
pub use discovery::LinkDiscovery;
pub use error::PortalError;
pub use observer::{NoopObserver, RetrievalObserver, TracingObserver};
pub use session::{ElementMatcher, FetchResponse, PortalSession, SessionLauncher, WaitOutcome};
