//! Progress reporting on stderr

#![allow(clippy::print_stderr)]

use integration_portal::{RetrievalObserver, TracingObserver};

/// Prints status lines to stderr and forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver {
    quiet: bool,
}

impl ConsoleObserver {
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl RetrievalObserver for ConsoleObserver {
    fn status(&self, text: &str) {
        if !self.quiet {
            eprintln!("… {text}");
        }
        TracingObserver.status(text);
    }

    fn log(&self, event: &str, data: &str) {
        TracingObserver.log(event, data);
    }
}
