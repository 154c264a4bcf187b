//! Metric-producing collectors.
//!
//! A collector translates counter objects from the per-scrape
//! [`ScrapeContext`] into metric samples.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Orchestrator                       │
//! │                                                          │
//! │  Arc<ScrapeContext> ──┬────────────────┬────────────┐    │
//! │                       │                │            │    │
//! │               ┌───────▼──────┐ ┌───────▼─────┐ ┌────▼──┐ │
//! │               │     net      │ │    dfsr     │ │ msmq  │ │
//! │               │ "Network     │ │ "DFS ..."   │ │"MSMQ  │ │
//! │               │  Interface"  │ │ (up to 3)   │ │ Queue"│ │
//! │               └───────┬──────┘ └───────┬─────┘ └────┬──┘ │
//! │                       └────────────────┼────────────┘    │
//! │                                 ┌──────▼──────┐          │
//! │                                 │ MetricSink  │ (trait)  │
//! │                                 └─────────────┘          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each collector module exposes a `descriptor()` for the
//! [`Registry`](crate::registry::Registry), a validated `*Config` built from
//! [`CollectorSettings`](crate::config::CollectorSettings), and the collector
//! itself, which cannot fail to construct once its config exists.

pub mod dfsr;
pub mod msmq;
pub mod net;
mod table;

use std::time::Duration;

use thiserror::Error;

use crate::context::ScrapeContext;
use crate::metric::MetricSink;

pub use dfsr::DfsrCollector;
pub use msmq::MsmqCollector;
pub use net::NetCollector;

/// Failure of a single collector during one scrape.
///
/// Isolated by the orchestrator: it never aborts sibling collectors.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The scrape context holds no data for a declared counter object.
    #[error("counter object {0:?} missing from snapshot")]
    MissingObject(String),
    /// The collector did not finish before the scrape deadline.
    #[error("collector timed out after {0:?}")]
    Timeout(Duration),
    /// The previous invocation has not returned yet, so this scrape did not
    /// start another one.
    #[error("collector still running from a previous scrape")]
    StillRunning,
    /// The collector panicked.
    #[error("collector panicked")]
    Panicked,
    #[error("{0}")]
    Other(String),
}

/// A built collector instance.
///
/// Owned by the orchestrator for the lifetime of the process and invoked
/// once per scrape, possibly from several threads over its lifetime.
pub trait Collector: Send + Sync {
    /// Writes this collector's samples for the current scrape into `sink`.
    ///
    /// Must not mutate `ctx` or keep references into it after returning, and
    /// must not perform blocking I/O.
    fn collect(&self, ctx: &ScrapeContext, sink: &dyn MetricSink) -> Result<(), CollectError>;

    /// Counter objects this instance reads.
    ///
    /// `declared` is the list given at registration. Collectors whose needs
    /// depend on configuration override this.
    fn dependencies(&self, declared: &[&'static str]) -> Vec<String> {
        declared.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Sample, SampleBuffer};

    struct Fixed;

    impl Collector for Fixed {
        fn collect(&self, _ctx: &ScrapeContext, sink: &dyn MetricSink) -> Result<(), CollectError> {
            sink.push(Sample::gauge("windows_fixed", "", 1.0));
            Ok(())
        }
    }

    #[test]
    fn test_default_dependencies_are_declared_list() {
        let deps = Fixed.dependencies(&["Processor", "Memory"]);
        assert_eq!(deps, vec!["Processor".to_string(), "Memory".to_string()]);
        assert!(Fixed.dependencies(&[]).is_empty());
    }

    #[test]
    fn test_collect_into_buffer() {
        let buffer = SampleBuffer::new();
        Fixed.collect(&ScrapeContext::default(), &buffer).unwrap();
        assert_eq!(buffer.len(), 1);
    }
}
