//! Support code for the `schedsync-cli` binary
//!
//! Rendering and local file inspection live here so they can be tested
//! without a browser.

pub mod files;
pub mod observer;
pub mod output;
