//! HTTP request handlers: metrics, health and landing page.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, warn};

use perfex_core::exporter::client_timeout;
use perfex_core::{Exporter, exposition};

use crate::state::AppState;

/// Header Prometheus sends with its per-target scrape timeout.
const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

// ============================================================
// Metrics
// ============================================================

pub(crate) async fn handle_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let header = headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok());
    let timeout = client_timeout(header, state.timeout_margin);

    let outcome = match state.exporter.scrape(timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "scrape failed");
            let body = format!("scrape failed: {e}\n");
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }
    };

    match Exporter::render(&outcome) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition::content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("encoding failed: {e}\n")).into_response()
        }
    }
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Landing page
// ============================================================

pub(crate) async fn handle_landing(State(state): State<AppState>) -> Html<String> {
    let path = &state.telemetry_path;
    Html(format!(
        "<html>\n<head><title>perfexd</title></head>\n<body>\n\
         <h1>perfexd</h1>\n\
         <p>Version {version}</p>\n\
         <p>Collectors: {collectors}</p>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        version = perfex_core::VERSION,
        collectors = state.exporter.orchestrator().collectors().join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use perfex_core::provider::{MockProvider, SnapshotProvider};
    use perfex_core::{Exporter, OrchestratorConfig, Registry};

    use super::*;
    use crate::build_router;

    fn app(enabled: &str, provider: Arc<dyn SnapshotProvider>) -> axum::Router {
        let registry = Registry::with_builtin().unwrap();
        let exporter = Exporter::from_settings(
            &registry,
            enabled,
            &HashMap::new(),
            provider,
            OrchestratorConfig::default(),
        )
        .unwrap();
        build_router(AppState::new(exporter, Duration::from_millis(500), "/metrics"))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, HeaderMap, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_ok() {
        let app = app("net", Arc::new(MockProvider::typical_host()));
        let (status, headers, body) = get(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert!(body.contains("windows_net_bytes_received_total{nic=\"Ethernet_1\"} 1000"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_still_ok() {
        let app = app("net,dfsr", Arc::new(MockProvider::new()));
        let (status, _, body) = get(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("windows_exporter_collector_success{collector=\"dfsr\"} 0"));
        assert!(body.contains("windows_exporter_collector_success{collector=\"net\"} 0"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_unavailable() {
        let app = app("net", Arc::new(MockProvider::failing("backend down")));
        let (status, _, body) = get(app, "/metrics").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("backend down"));
    }

    #[tokio::test]
    async fn test_timeout_header_bounds_snapshot() {
        let provider = MockProvider::typical_host().with_delay(Duration::from_millis(1500));
        let app = app("net", Arc::new(provider));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .header(SCRAPE_TIMEOUT_HEADER, "0.6")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let app = app("net", Arc::new(MockProvider::typical_host()));
        let (status, _, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_landing_links_metrics() {
        let app = app("msmq,net", Arc::new(MockProvider::typical_host()));
        let (status, _, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/metrics\""));
        assert!(body.contains("msmq, net"));
    }
}
