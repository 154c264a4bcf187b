mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use perfex_core::config::{self, CollectorSettings, ConfigOption};
use perfex_core::enabled::DEFAULTS_PLACEHOLDER;
use perfex_core::exporter::ENABLED_KEY;
use perfex_core::provider::{FileProvider, MockProvider, SnapshotProvider};
use perfex_core::{Exporter, OrchestratorConfig, Registry};

use state::AppState;

// ============================================================
// CLI
// ============================================================

/// Collector options (`--collector.net.nic-whitelist`, ...) are added at
/// runtime from the registry.
#[derive(Parser)]
#[command(
    name = "perfexd",
    about = "Performance counter metrics exporter",
    version = perfex_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9182", env = "PERFEX_LISTEN")]
    listen: String,

    /// Comma-separated list of collectors to use. "[defaults]" expands to the
    /// default set.
    #[arg(long = "collectors.enabled", value_name = "LIST")]
    collectors_enabled: Option<String>,

    /// YAML file with collector settings. Command-line flags take precedence.
    #[arg(long = "config.file", value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// JSON counter snapshot, re-read on every scrape.
    #[arg(long = "snapshot.file", value_name = "PATH", conflicts_with = "demo")]
    snapshot_file: Option<PathBuf>,

    /// Serve a built-in sample host instead of a real counter backend.
    #[arg(long)]
    demo: bool,

    /// Seconds subtracted from the scraper's timeout header.
    #[arg(long = "scrape.timeout-margin", default_value_t = 0.5, value_name = "SECONDS")]
    timeout_margin: f64,

    /// Upper bound of a scrape cycle in seconds.
    #[arg(long = "scrape.max-duration", default_value_t = 10.0, value_name = "SECONDS")]
    max_duration: f64,

    /// Serve a completed scrape again for this many milliseconds.
    #[arg(long = "scrape.cache-ttl", default_value_t = 0, value_name = "MS")]
    cache_ttl: u64,

    /// Path under which to expose metrics.
    #[arg(long = "telemetry.path", default_value = "/metrics")]
    telemetry_path: String,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Errors only.
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// Main
// ============================================================

fn main() {
    let registry = match Registry::with_builtin() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("perfexd: {e}");
            process::exit(1);
        }
    };

    let matches = config::register_flags(Args::command(), registry.options()).get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    init_logging(args.verbose, args.quiet);

    let state = match configure(&registry, &args, &matches) {
        Ok(state) => state,
        Err(msg) => {
            error!("{msg}");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(msg) = runtime.block_on(serve(&args.listen, state)) {
        error!("{msg}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

/// Builds the exporter from flags, the optional config file and defaults.
fn configure(
    registry: &Registry,
    args: &Args,
    matches: &clap::ArgMatches,
) -> Result<AppState, String> {
    let path = args.telemetry_path.as_str();
    if !path.starts_with('/') || matches!(path, "/" | "/health") {
        return Err(format!("invalid --telemetry.path {:?}", args.telemetry_path));
    }
    let timeout_margin = seconds("--scrape.timeout-margin", args.timeout_margin)?;
    let max_duration = seconds("--scrape.max-duration", args.max_duration)?;

    let file = match &args.config_file {
        Some(path) => config::load_yaml_file(path)
            .map_err(|e| format!("failed to load {}: {e}", path.display()))?,
        None => Default::default(),
    };

    let enabled = args
        .collectors_enabled
        .clone()
        .or_else(|| file.get(ENABLED_KEY).cloned())
        .unwrap_or_else(|| DEFAULTS_PLACEHOLDER.to_string());

    let provider: Arc<dyn SnapshotProvider> = match (&args.snapshot_file, args.demo) {
        (Some(path), _) => {
            info!(path = %path.display(), "reading counter snapshots from file");
            Arc::new(FileProvider::new(path))
        }
        (None, true) => {
            warn!("demo mode, serving a built-in sample host");
            Arc::new(MockProvider::typical_host())
        }
        (None, false) => {
            return Err("no counter backend configured, pass --snapshot.file or --demo".into());
        }
    };

    let orchestrator_config = OrchestratorConfig {
        max_duration,
        cache_ttl: Duration::from_millis(args.cache_ttl),
    };

    let bind = |options: &[ConfigOption]| {
        CollectorSettings::from_matches_with_file(options, matches, &file)
    };
    let exporter = Exporter::configure(registry, &enabled, provider, orchestrator_config, bind)
        .map_err(|e| format!("configuration failed: {e}"))?;

    Ok(AppState::new(exporter, timeout_margin, &args.telemetry_path))
}

fn seconds(flag: &str, value: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value).map_err(|e| format!("invalid {flag} {value}: {e}"))
}

pub(crate) fn build_router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.to_string();
    Router::new()
        .route("/", get(handlers::handle_landing))
        .route("/health", get(handlers::handle_health))
        .route(&telemetry_path, get(handlers::handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve(listen: &str, state: AppState) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid listen address {listen:?}: {e}"))?;

    info!(
        version = perfex_core::VERSION,
        %addr,
        collectors = %state.exporter.orchestrator().collectors().join(","),
        telemetry_path = %state.telemetry_path,
        "starting perfexd"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (Registry, Args, clap::ArgMatches) {
        let registry = Registry::with_builtin().unwrap();
        let matches = config::register_flags(Args::command(), registry.options())
            .try_get_matches_from(argv)
            .unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        (registry, args, matches)
    }

    #[test]
    fn test_defaults() {
        let (_, args, _) = parse(&["perfexd"]);
        assert_eq!(args.listen, "0.0.0.0:9182");
        assert_eq!(args.telemetry_path, "/metrics");
        assert_eq!(args.timeout_margin, 0.5);
        assert!(args.collectors_enabled.is_none());
    }

    #[test]
    fn test_collector_flags_registered() {
        let (_, _, matches) = parse(&["perfexd", "--collector.net.nic-blacklist", "isatap.*"]);
        assert_eq!(
            matches.get_one::<String>("collector.net.nic-blacklist").map(String::as_str),
            Some("isatap.*")
        );
    }

    #[test]
    fn test_configure_demo() {
        let (registry, args, matches) =
            parse(&["perfexd", "--demo", "--collectors.enabled", "net,dfsr"]);
        let state = configure(&registry, &args, &matches).unwrap();
        assert_eq!(
            state.exporter.orchestrator().collectors(),
            &["dfsr".to_string(), "net".to_string()]
        );
    }

    #[test]
    fn test_configure_requires_backend() {
        let (registry, args, matches) = parse(&["perfexd"]);
        assert!(configure(&registry, &args, &matches).is_err());
    }

    #[test]
    fn test_configure_rejects_unknown_collector() {
        let (registry, args, matches) =
            parse(&["perfexd", "--demo", "--collectors.enabled", "iis"]);
        let err = configure(&registry, &args, &matches).err().unwrap();
        assert!(err.contains("iis"));
    }

    #[test]
    fn test_config_file_enabled_and_flag_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "collectors:\n  enabled: msmq\ncollector:\n  msmq:\n    queue-whitelist: \"[\"\n",
        )
        .unwrap();

        let path_arg = path.to_str().unwrap();
        let (registry, args, matches) = parse(&["perfexd", "--demo", "--config.file", path_arg]);
        let err = configure(&registry, &args, &matches).err().unwrap();
        assert!(err.contains("queue-whitelist"));

        let (registry, args, matches) = parse(&[
            "perfexd",
            "--demo",
            "--config.file",
            path_arg,
            "--collector.msmq.queue-whitelist",
            ".*orders",
        ]);
        let state = configure(&registry, &args, &matches).unwrap();
        assert_eq!(state.exporter.orchestrator().collectors(), &["msmq".to_string()]);
    }

    #[test]
    fn test_invalid_telemetry_path() {
        let (registry, args, matches) =
            parse(&["perfexd", "--demo", "--telemetry.path", "metrics"]);
        assert!(configure(&registry, &args, &matches).is_err());

        let (registry, args, matches) =
            parse(&["perfexd", "--demo", "--telemetry.path", "/health"]);
        assert!(configure(&registry, &args, &matches).is_err());
    }
}
