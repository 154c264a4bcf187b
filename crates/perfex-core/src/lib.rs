//! perfex-core — orchestration core of a performance-counter metrics exporter.
//!
//! Provides:
//! - `registry` — catalog of collectors, built once at startup
//! - `config` — collector option binding (settings map, YAML, clap flags)
//! - `enabled` — enabled-collector list parsing
//! - `resolver` — counter-object dependency resolution
//! - `context` — per-scrape counter snapshot
//! - `orchestrator` — scrape cycle execution and meta-metrics
//! - `exporter` — startup entry point tying the above together
//! - `collector` — bundled collectors (`net`, `dfsr`, `msmq`)
//! - `provider` — counter snapshot sources (file, mock)
//! - `metric`, `exposition` — samples and Prometheus text encoding
//!
//! With `cli` feature (default):
//! - flag registration and binding on a clap `Command`

pub mod collector;
pub mod config;
pub mod context;
pub mod enabled;
pub mod exporter;
pub mod exposition;
pub mod metric;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use exporter::{Exporter, StartupError};
pub use orchestrator::{Orchestrator, OrchestratorConfig, ScrapeOutcome, ScrapeStatus};
pub use registry::Registry;

/// Crate version with the git revision it was built from.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")");
