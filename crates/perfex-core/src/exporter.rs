//! Startup entry point.
//!
//! [`Exporter::configure`] is the single place where the enabled list is
//! parsed, collectors are configured and built, and the orchestrator is
//! assembled. Every startup problem comes back as a [`StartupError`]; the host
//! decides how to surface it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config::{self, CollectorSettings, ConfigError, ConfigOption};
use crate::context::ContextError;
use crate::enabled::{DEFAULTS_PLACEHOLDER, expand_enabled_collectors};
use crate::exposition::{self, ExpositionError};
use crate::orchestrator::{Orchestrator, OrchestratorConfig, ScrapeOutcome};
use crate::provider::SnapshotProvider;
use crate::registry::{Registry, RegistryError};

/// Config-file key holding the enabled collector list.
pub const ENABLED_KEY: &str = "collectors.enabled";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A configured exporter, ready to serve scrapes.
pub struct Exporter {
    orchestrator: Orchestrator,
}

impl Exporter {
    /// Builds every collector named in `enabled`.
    ///
    /// `bind` resolves the settings of one collector from its declared
    /// options. Unknown names are rejected before anything is built.
    pub fn configure<F>(
        registry: &Registry,
        enabled: &str,
        provider: Arc<dyn SnapshotProvider>,
        config: OrchestratorConfig,
        bind: F,
    ) -> Result<Self, StartupError>
    where
        F: Fn(&[ConfigOption]) -> CollectorSettings,
    {
        let names = expand_enabled_collectors(enabled);
        registry.validate(&names)?;

        let collectors = names
            .iter()
            .map(|name| {
                let descriptor = registry.descriptor(name)?;
                registry.build(name, &bind(descriptor.options()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let orchestrator = Orchestrator::new(collectors, provider, config);
        info!(
            collectors = %orchestrator.collectors().join(","),
            objects = %orchestrator.resolver().query(orchestrator.collectors()),
            "exporter configured"
        );
        Ok(Self { orchestrator })
    }

    /// Library entry point: options come from a settings map.
    pub fn from_settings(
        registry: &Registry,
        enabled: &str,
        settings: &HashMap<String, String>,
        provider: Arc<dyn SnapshotProvider>,
        config: OrchestratorConfig,
    ) -> Result<Self, StartupError> {
        Self::configure(registry, enabled, provider, config, |options| {
            CollectorSettings::from_map(options, settings)
        })
    }

    /// Library entry point: options come from a YAML document.
    ///
    /// When `enabled` is `None` the list is read from `collectors.enabled` in
    /// the document, falling back to the default collectors.
    pub fn from_yaml(
        registry: &Registry,
        enabled: Option<&str>,
        yaml: &str,
        provider: Arc<dyn SnapshotProvider>,
        config: OrchestratorConfig,
    ) -> Result<Self, StartupError> {
        let settings = config::flatten_yaml(yaml)?;
        let enabled = enabled
            .or_else(|| settings.get(ENABLED_KEY).map(String::as_str))
            .unwrap_or(DEFAULTS_PLACEHOLDER)
            .to_string();
        Self::from_settings(registry, &enabled, &settings, provider, config)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn scrape(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Arc<ScrapeOutcome>, ContextError> {
        self.orchestrator.scrape(timeout).await
    }

    /// Encodes a completed scrape to the text exposition format.
    pub fn render(outcome: &ScrapeOutcome) -> Result<String, ExpositionError> {
        exposition::encode(&outcome.samples)
    }
}

/// Time a client allows for a scrape, from its
/// `X-Prometheus-Scrape-Timeout-Seconds` header minus `margin`.
///
/// Unparsable or non-positive headers yield `None`. A margin larger than the
/// header leaves the header value unchanged.
pub fn client_timeout(header: Option<&str>, margin: Duration) -> Option<Duration> {
    let seconds: f64 = header?.trim().parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let allowed = seconds - margin.as_secs_f64();
    Some(Duration::from_secs_f64(if allowed > 0.0 { allowed } else { seconds }))
}
