//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  — Prometheus text format
//!   GET /healthz  — Liveness probe (always 200 if process is running)
//!   GET /readyz   — Readiness probe (200 if blob storage is reachable)

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::sync::Arc;

use sealdrop_core::types::DenyReason;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DownloadLabels {
    pub outcome: String,
}

/// Counters for the share lifecycle.
pub struct AppMetrics {
    pub registry: Registry,
    pub shares_created: Counter,
    pub downloads: Family<DownloadLabels, Counter>,
    pub purged: Counter,
}

impl AppMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let shares_created = Counter::default();
        registry.register(
            "sealdrop_shares_created",
            "Shares created",
            shares_created.clone(),
        );

        let downloads = Family::<DownloadLabels, Counter>::default();
        registry.register(
            "sealdrop_downloads",
            "Download attempts by outcome",
            downloads.clone(),
        );

        let purged = Counter::default();
        registry.register(
            "sealdrop_purged",
            "Shares purged (expired or exhausted)",
            purged.clone(),
        );

        Self {
            registry,
            shares_created,
            downloads,
            purged,
        }
    }

    pub fn record_grant(&self) {
        self.downloads
            .get_or_create(&DownloadLabels {
                outcome: "granted".into(),
            })
            .inc();
    }

    pub fn record_denial(&self, reason: DenyReason) {
        let outcome = match reason {
            DenyReason::NotFound => "not_found",
            DenyReason::Expired => "expired",
            DenyReason::Exhausted => "exhausted",
            DenyReason::BadPassword => "bad_password",
        };
        self.downloads
            .get_or_create(&DownloadLabels {
                outcome: outcome.into(),
            })
            .inc();
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared health state updated by the daemon
#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<AppMetrics>,
    pub operator: opendal::Operator,
}

/// Serve Prometheus metrics and health endpoints on `addr` (e.g. "127.0.0.1:9311")
pub async fn serve(addr: String, state: HealthState) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("metrics bind {addr}: {e}"))?;

    tracing::info!(addr = %addr, "metrics: listening on /metrics, /healthz, /readyz");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("metrics server: {e}"))
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.metrics.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if blob storage is reachable, 503 otherwise.
async fn readyz_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match sealdrop_store::check_health(&state.operator).await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable"),
    }
}
