//! Shared application state and the global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use perfex_core::Exporter;

/// State handed to every request handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) exporter: Arc<Exporter>,
    /// Subtracted from the client's scrape timeout header.
    pub(crate) timeout_margin: Duration,
    pub(crate) telemetry_path: Arc<str>,
}

impl AppState {
    pub(crate) fn new(exporter: Exporter, timeout_margin: Duration, telemetry_path: &str) -> Self {
        Self {
            exporter: Arc::new(exporter),
            timeout_margin,
            telemetry_path: Arc::from(telemetry_path),
        }
    }
}
