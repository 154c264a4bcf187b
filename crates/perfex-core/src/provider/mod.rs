//! Counter snapshot providers.
//!
//! A provider turns a list of counter-object names into a materialized
//! [`SnapshotData`]. The real performance-counter backend lives outside this
//! crate; [`FileProvider`] reads a recorded snapshot from disk and
//! [`MockProvider`] serves canned data for tests and demos.
//!
//! ```text
//!   ContextBuilder ──fetch(["Network Interface", ...])──▶ SnapshotProvider
//!                                                          │
//!                          ┌───────────────────────────────┼──────────────┐
//!                          │                               │              │
//!                   ┌──────▼──────┐                 ┌──────▼──────┐ ┌─────▼──────┐
//!                   │ FileProvider│                 │ MockProvider│ │  external  │
//!                   │ (JSON dump) │                 │  (testing)  │ │  backends  │
//!                   └─────────────┘                 └─────────────┘ └────────────┘
//! ```

mod file;
pub mod mock;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileProvider;
pub use mock::MockProvider;

/// Failure to obtain a snapshot. Always total: there is no partial snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Backend could not be reached (or the recording could not be read).
    #[error("counter backend unavailable: {0}")]
    Unavailable(String),
    /// Backend answered with data that could not be parsed.
    #[error("malformed counter data: {0}")]
    Malformed(String),
}

/// One instance of a counter object (e.g. a single network adapter).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterInstance {
    pub name: String,
    #[serde(default)]
    pub counters: HashMap<String, f64>,
}

impl CounterInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counters: HashMap::new(),
        }
    }

    /// Builder-style counter assignment, mostly for fixtures.
    pub fn with(mut self, counter: impl Into<String>, value: f64) -> Self {
        self.counters.insert(counter.into(), value);
        self
    }

    /// Returns the counter value, or `0.0` when the backend did not report it.
    pub fn value(&self, counter: &str) -> f64 {
        self.counters.get(counter).copied().unwrap_or(0.0)
    }
}

/// A named group of related counters with all of its instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterObject {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<CounterInstance>,
}

impl CounterObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: CounterInstance) -> Self {
        self.instances.push(instance);
        self
    }
}

/// Materialized counter objects keyed by object name.
pub type SnapshotData = HashMap<String, CounterObject>;

/// Source of counter snapshots.
///
/// Implementations may block (system calls, network); callers run them on a
/// blocking thread.
pub trait SnapshotProvider: Send + Sync {
    /// Fetches the named counter objects.
    ///
    /// Objects the backend does not know are simply absent from the result.
    fn fetch(&self, objects: &[String]) -> Result<SnapshotData, ProviderError>;
}

impl<P: SnapshotProvider + ?Sized> SnapshotProvider for std::sync::Arc<P> {
    fn fetch(&self, objects: &[String]) -> Result<SnapshotData, ProviderError> {
        (**self).fetch(objects)
    }
}
