//! Scrape cycle execution.
//!
//! ```text
//!  scrape() ──► Idle ──► Resolving ──► Snapshotting ──► Collecting ──► Done
//!                                          │                │
//!                                    Err(ContextError)      ├─ net   ─┐
//!                                       (fatal)             ├─ dfsr  ─┼─► samples + meta-metrics
//!                                                           └─ msmq  ─┘
//! ```
//!
//! Snapshot acquisition and every collector run on the blocking thread pool
//! under one shared deadline. Collectors are isolated from each other: an
//! error, a panic or a timeout only marks that collector failed.
//!
//! Scrapes are serialized per orchestrator, and a snapshot acquisition that
//! outlived its cycle's deadline is joined by the next cycle instead of being
//! started again, so at most one acquisition is in flight. A request that
//! waited behind another scrape reuses the result that completed meanwhile.
//!
//! The same holds per collector: a collector still running from an earlier
//! cycle is not dispatched again and is reported failed for the current one.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle, spawn_blocking};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, warn};

use crate::collector::{CollectError, Collector};
use crate::context::{ContextBuilder, ContextError, ScrapeContext};
use crate::metric::{NAMESPACE, Sample, SampleBuffer, fq_name};
use crate::provider::{ProviderError, SnapshotProvider};
use crate::registry::BuiltCollector;
use crate::resolver::DependencyResolver;

const META_SUBSYSTEM: &str = "exporter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound of a scrape cycle regardless of what the client allows.
    pub max_duration: Duration,
    /// Completed results younger than this are served again.
    pub cache_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(10),
            cache_ttl: Duration::ZERO,
        }
    }
}

/// Where the orchestrator currently is in a scrape cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScrapePhase {
    Idle = 0,
    Resolving = 1,
    Snapshotting = 2,
    Collecting = 3,
}

impl ScrapePhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Resolving,
            2 => Self::Snapshotting,
            3 => Self::Collecting,
            _ => Self::Idle,
        }
    }
}

/// Result of a non-fatal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Success,
    /// At least one collector failed; the others' samples are still served.
    PartialFailure,
}

/// Per-collector result of one cycle.
#[derive(Debug, Clone)]
pub struct CollectorReport {
    pub collector: String,
    pub duration: Duration,
    pub error: Option<String>,
}

impl CollectorReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// A completed scrape cycle.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub status: ScrapeStatus,
    /// Collector samples followed by the meta-metrics.
    pub samples: Vec<Sample>,
    /// Sorted by collector name.
    pub reports: Vec<CollectorReport>,
    pub duration: Duration,
    pub completed_at: Instant,
}

impl ScrapeOutcome {
    pub fn failed_collectors(&self) -> impl Iterator<Item = &CollectorReport> {
        self.reports.iter().filter(|r| !r.success())
    }
}

struct Entry {
    name: String,
    collector: Arc<dyn Collector>,
    /// Set while an invocation runs on the blocking pool, including one whose
    /// cycle has already given up on it.
    running: Arc<AtomicBool>,
}

type PendingFetch = JoinHandle<Result<ScrapeContext, ContextError>>;

/// Guarded by one async mutex so scrapes run one at a time.
#[derive(Default)]
struct ScrapeState {
    last: Option<Arc<ScrapeOutcome>>,
    /// Acquisition abandoned by a timed-out cycle that has not returned yet.
    pending_fetch: Option<PendingFetch>,
}

/// Runs scrape cycles over a fixed set of built collectors.
pub struct Orchestrator {
    entries: Vec<Entry>,
    names: Vec<String>,
    builder: ContextBuilder,
    config: OrchestratorConfig,
    phase: AtomicU8,
    state: Mutex<ScrapeState>,
}

impl Orchestrator {
    pub fn new(
        collectors: Vec<BuiltCollector>,
        provider: Arc<dyn SnapshotProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let mut resolver = DependencyResolver::new();
        let mut entries: Vec<Entry> = collectors
            .into_iter()
            .map(|built| {
                resolver.insert(built.name.clone(), built.dependencies);
                Entry {
                    name: built.name,
                    collector: Arc::from(built.collector),
                    running: Arc::new(AtomicBool::new(false)),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let names = entries.iter().map(|e| e.name.clone()).collect();

        Self {
            entries,
            names,
            builder: ContextBuilder::new(provider, resolver),
            config,
            phase: AtomicU8::new(ScrapePhase::Idle as u8),
            state: Mutex::new(ScrapeState::default()),
        }
    }

    /// Enabled collector names, sorted.
    pub fn collectors(&self) -> &[String] {
        &self.names
    }

    pub fn resolver(&self) -> &DependencyResolver {
        self.builder.resolver()
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    pub fn phase(&self) -> ScrapePhase {
        ScrapePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Runs one scrape cycle, or serves a recently completed one.
    ///
    /// `timeout` is the client's budget; it is capped by
    /// [`OrchestratorConfig::max_duration`]. Fatal cycles are never cached.
    pub async fn scrape(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Arc<ScrapeOutcome>, ContextError> {
        let requested = Instant::now();
        let mut state = self.state.lock().await;

        if let Some(prev) = state.last.as_ref() {
            let fresh = prev.completed_at.elapsed() < self.config.cache_ttl;
            if prev.completed_at > requested || fresh {
                debug!("serving completed scrape result");
                return Ok(Arc::clone(prev));
            }
        }

        let budget = timeout.map_or(self.config.max_duration, |t| {
            t.min(self.config.max_duration)
        });
        let outcome = Arc::new(self.run(&mut state, budget).await?);
        state.last = Some(Arc::clone(&outcome));
        Ok(outcome)
    }

    async fn run(
        &self,
        state: &mut ScrapeState,
        budget: Duration,
    ) -> Result<ScrapeOutcome, ContextError> {
        let _idle = PhaseGuard(&self.phase);
        let started = Instant::now();
        let deadline = started + budget;

        self.set_phase(ScrapePhase::Resolving);
        let objects = self.builder.required_objects(&self.names);

        self.set_phase(ScrapePhase::Snapshotting);
        let ctx = match self.snapshot(state, objects, deadline, budget).await {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                error!(error = %e, "scrape aborted");
                return Err(e);
            }
        };

        self.set_phase(ScrapePhase::Collecting);
        let (mut samples, reports) = self.collect_all(ctx, deadline).await;

        let status = if reports.iter().all(CollectorReport::success) {
            ScrapeStatus::Success
        } else {
            ScrapeStatus::PartialFailure
        };
        for report in &reports {
            samples.extend(meta_samples(report));
        }

        let duration = started.elapsed();
        debug!(
            ?status,
            samples = samples.len(),
            duration_ms = duration.as_millis() as u64,
            "scrape completed"
        );
        Ok(ScrapeOutcome {
            status,
            samples,
            reports,
            duration,
            completed_at: Instant::now(),
        })
    }

    /// Acquires the snapshot for this cycle.
    ///
    /// An acquisition still running from a timed-out cycle is joined rather
    /// than duplicated. One that already returned is discarded as stale. On
    /// timeout the task is parked in `state` for the next cycle.
    async fn snapshot(
        &self,
        state: &mut ScrapeState,
        objects: BTreeSet<String>,
        deadline: Instant,
        budget: Duration,
    ) -> Result<ScrapeContext, ContextError> {
        if objects.is_empty() {
            return self.builder.fetch(&objects);
        }

        let mut handle = match state.pending_fetch.take() {
            Some(pending) if !pending.is_finished() => {
                debug!("joining snapshot acquisition of a previous cycle");
                pending
            }
            _ => {
                let builder = self.builder.clone();
                spawn_blocking(move || builder.fetch(&objects))
            }
        };

        match timeout_at(deadline, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ContextError::SnapshotUnavailable(
                ProviderError::Unavailable(format!("provider task failed: {join}")),
            )),
            Err(_) => {
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "snapshot acquisition timed out, leaving it to the next cycle"
                );
                state.pending_fetch = Some(handle);
                Err(ContextError::Timeout(budget))
            }
        }
    }

    async fn collect_all(
        &self,
        ctx: Arc<ScrapeContext>,
        deadline: Instant,
    ) -> (Vec<Sample>, Vec<CollectorReport>) {
        let tasks: Vec<_> = self
            .entries
            .iter()
            .map(|entry| {
                let buffer = Arc::new(SampleBuffer::new());
                let started = Instant::now();
                let handle = Self::dispatch(entry, &ctx, &buffer);
                (entry.name.as_str(), buffer, started, handle)
            })
            .collect();

        let mut samples = Vec::new();
        let mut reports = Vec::with_capacity(tasks.len());

        for (name, buffer, started, handle) in tasks {
            let (result, duration) = match handle {
                None => (Err(CollectError::StillRunning), Duration::ZERO),
                Some(handle) => match timeout_at(deadline, handle).await {
                    Ok(Ok((result, duration))) => (result, duration),
                    Ok(Err(join)) => (Err(join_error(join)), started.elapsed()),
                    Err(_) => {
                        let waited = started.elapsed();
                        (Err(CollectError::Timeout(waited)), waited)
                    }
                },
            };

            // Late samples of a timed-out collector are dropped with its buffer.
            if !matches!(result, Err(CollectError::Timeout(_))) {
                samples.extend(buffer.drain());
            }

            let error = match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        collector = name,
                        duration_ms = duration.as_millis() as u64,
                        error = %e,
                        "collector failed"
                    );
                    Some(e.to_string())
                }
            };
            reports.push(CollectorReport {
                collector: name.to_string(),
                duration,
                error,
            });
        }

        (samples, reports)
    }

    /// Starts `entry` on the blocking pool, unless its previous invocation
    /// has not returned yet.
    fn dispatch(
        entry: &Entry,
        ctx: &Arc<ScrapeContext>,
        buffer: &Arc<SampleBuffer>,
    ) -> Option<JoinHandle<(Result<(), CollectError>, Duration)>> {
        if entry
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let collector = Arc::clone(&entry.collector);
        let ctx = Arc::clone(ctx);
        let sink = Arc::clone(buffer);
        let running = RunningGuard(Arc::clone(&entry.running));
        let started = Instant::now();
        Some(spawn_blocking(move || {
            let _running = running;
            let result = collector.collect(&ctx, sink.as_ref());
            (result, started.elapsed())
        }))
    }

    fn set_phase(&self, phase: ScrapePhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// Resets the phase to idle however the cycle ends.
struct PhaseGuard<'a>(&'a AtomicU8);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(ScrapePhase::Idle as u8, Ordering::Release);
    }
}

/// Clears a collector's in-flight flag when its invocation returns or panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn join_error(err: JoinError) -> CollectError {
    if err.is_panic() {
        CollectError::Panicked
    } else {
        CollectError::Other(err.to_string())
    }
}

fn meta_samples(report: &CollectorReport) -> [Sample; 2] {
    [
        Sample::gauge(
            fq_name(NAMESPACE, META_SUBSYSTEM, "collector_duration_seconds"),
            "windows_exporter: Duration of a collection.",
            report.duration.as_secs_f64(),
        )
        .label("collector", report.collector.as_str()),
        Sample::gauge(
            fq_name(NAMESPACE, META_SUBSYSTEM, "collector_success"),
            "windows_exporter: Whether the collector was successful.",
            if report.success() { 1.0 } else { 0.0 },
        )
        .label("collector", report.collector.as_str()),
    ]
}
