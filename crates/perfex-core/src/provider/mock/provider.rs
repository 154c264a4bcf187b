//! In-memory counter snapshot provider.
//!
//! `MockProvider` answers fetches from a fixed set of counter objects and
//! remembers every request, so tests can assert which objects a scrape asked
//! for.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::provider::{CounterObject, ProviderError, SnapshotData, SnapshotProvider};

/// In-memory snapshot provider.
#[derive(Debug, Default)]
pub struct MockProvider {
    objects: SnapshotData,
    /// When set, every fetch fails with `Unavailable(reason)`.
    failure: Option<String>,
    /// Artificial latency applied to each fetch.
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockProvider {
    /// Creates a provider with no counter objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a counter object.
    pub fn add_object(&mut self, object: CounterObject) {
        self.objects.insert(object.name.clone(), object);
    }

    /// Builder-style variant of [`add_object`](Self::add_object).
    pub fn with_object(mut self, object: CounterObject) -> Self {
        self.add_object(object);
        self
    }

    /// Makes every subsequent fetch fail.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Delays every fetch by `delay` (blocks the calling thread).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Object lists of all fetches so far, in call order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of fetches served (or refused) so far.
    pub fn fetch_count(&self) -> usize {
        self.requests().len()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

impl SnapshotProvider for MockProvider {
    fn fetch(&self, objects: &[String]) -> Result<SnapshotData, ProviderError> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(objects.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(objects.to_vec()),
        }

        let running = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::AcqRel);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        if let Some(ref reason) = self.failure {
            return Err(ProviderError::Unavailable(reason.clone()));
        }

        Ok(objects
            .iter()
            .filter_map(|name| self.objects.get(name).map(|o| (name.clone(), o.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CounterInstance;

    #[test]
    fn test_mock_returns_only_requested_objects() {
        let provider = MockProvider::new()
            .with_object(CounterObject::new("A").with_instance(CounterInstance::new("a0")))
            .with_object(CounterObject::new("B"));

        let data = provider.fetch(&["A".to_string()]).unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.contains_key("A"));
        assert!(!data.contains_key("B"));
    }

    #[test]
    fn test_mock_unknown_object_is_absent() {
        let provider = MockProvider::new();
        let data = provider.fetch(&["Nope".to_string()]).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_mock_records_requests() {
        let provider = MockProvider::new();
        provider.fetch(&["A".to_string()]).unwrap();
        provider.fetch(&[]).unwrap();

        assert_eq!(provider.fetch_count(), 2);
        assert_eq!(provider.requests()[0], vec!["A".to_string()]);
        assert!(provider.requests()[1].is_empty());
    }

    #[test]
    fn test_mock_tracks_concurrent_fetches() {
        let provider = MockProvider::new().with_delay(Duration::from_millis(100));
        assert_eq!(provider.peak_in_flight(), 0);

        std::thread::scope(|s| {
            s.spawn(|| provider.fetch(&[]).unwrap());
            s.spawn(|| provider.fetch(&[]).unwrap());
        });
        assert_eq!(provider.peak_in_flight(), 2);

        provider.fetch(&[]).unwrap();
        assert_eq!(provider.peak_in_flight(), 2);
    }

    #[test]
    fn test_mock_failing() {
        let provider = MockProvider::failing("backend down");
        let err = provider.fetch(&["A".to_string()]).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert_eq!(provider.fetch_count(), 1);
    }
}
