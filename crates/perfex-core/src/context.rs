//! Per-scrape counter snapshot.
//!
//! A [`ScrapeContext`] is built fresh for every scrape by the
//! [`ContextBuilder`], shared read-only with all collectors of that scrape and
//! dropped afterwards. Counter values carry the backend's epoch, so a context
//! is never reused across scrapes.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::collector::CollectError;
use crate::provider::{CounterObject, ProviderError, SnapshotData, SnapshotProvider};
use crate::resolver::DependencyResolver;

/// Failure to build a scrape context. Fatal for the whole scrape.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(#[from] ProviderError),
    #[error("snapshot acquisition timed out after {0:?}")]
    Timeout(Duration),
}

/// Immutable counter data for one scrape.
#[derive(Debug, Default)]
pub struct ScrapeContext {
    objects: SnapshotData,
}

impl ScrapeContext {
    pub fn new(objects: SnapshotData) -> Self {
        Self { objects }
    }

    /// Counter object by name, if the snapshot holds it.
    pub fn get(&self, name: &str) -> Option<&CounterObject> {
        self.objects.get(name)
    }

    /// Counter object by name; absence is a collector error.
    pub fn object(&self, name: &str) -> Result<&CounterObject, CollectError> {
        self.get(name)
            .ok_or_else(|| CollectError::MissingObject(name.to_string()))
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Builds scrape contexts from the enabled collector set.
#[derive(Clone)]
pub struct ContextBuilder {
    provider: Arc<dyn SnapshotProvider>,
    resolver: Arc<DependencyResolver>,
}

impl ContextBuilder {
    pub fn new(provider: Arc<dyn SnapshotProvider>, resolver: DependencyResolver) -> Self {
        Self {
            provider,
            resolver: Arc::new(resolver),
        }
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Counter objects needed by `enabled`.
    pub fn required_objects<S: AsRef<str>>(&self, enabled: &[S]) -> BTreeSet<String> {
        self.resolver.resolve(enabled)
    }

    /// Fetches exactly `objects` from the provider.
    ///
    /// When nothing is required the backend is not asked at all.
    pub fn fetch(&self, objects: &BTreeSet<String>) -> Result<ScrapeContext, ContextError> {
        if objects.is_empty() {
            debug!("no counter objects required, skipping snapshot");
            return Ok(ScrapeContext::default());
        }

        let names: Vec<String> = objects.iter().cloned().collect();
        let data = self.provider.fetch(&names)?;
        debug!(
            requested = names.len(),
            received = data.len(),
            "counter snapshot acquired"
        );
        Ok(ScrapeContext::new(data))
    }

    /// Resolves dependencies of `enabled` and fetches them. Blocking.
    pub fn prepare<S: AsRef<str>>(&self, enabled: &[S]) -> Result<ScrapeContext, ContextError> {
        let objects = self.required_objects(enabled);
        self.fetch(&objects)
    }
}
