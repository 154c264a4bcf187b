//! Metric samples and the sink collectors write them to.

use std::sync::Mutex;

/// Namespace prepended to every exported metric name.
pub const NAMESPACE: &str = "windows";

/// Prometheus value type of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically non-decreasing cumulative value.
    Counter,
    /// Point-in-time value.
    Gauge,
}

/// A single metric value with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub kind: MetricKind,
}

impl Sample {
    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            value,
            kind: MetricKind::Counter,
        }
    }

    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            value,
            kind: MetricKind::Gauge,
        }
    }

    /// Appends a label pair. Label order is preserved.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Looks up a label value by key.
    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds a fully-qualified metric name from its non-empty parts.
///
/// `fq_name("windows", "net", "bytes_total")` → `windows_net_bytes_total`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Destination for samples. Must tolerate concurrent writers.
pub trait MetricSink: Send + Sync {
    fn push(&self, sample: Sample);
}

/// Mutex-protected sample vector.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Mutex<Vec<Sample>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.samples.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes all buffered samples, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Sample> {
        match self.samples.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn into_samples(self) -> Vec<Sample> {
        match self.samples.into_inner() {
            Ok(samples) => samples,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MetricSink for SampleBuffer {
    fn push(&self, sample: Sample) {
        match self.samples.lock() {
            Ok(mut guard) => guard.push(sample),
            Err(poisoned) => poisoned.into_inner().push(sample),
        }
    }
}
