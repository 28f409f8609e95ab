//! Health check endpoints

use crate::counter::PendingCounter;
use crate::metrics::OutletMetrics;
use crate::nats::NatsSink;
use crate::outlet::Outlet;
use crate::registry::Registry;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub outlet_open: bool,
    pub nats_connected: bool,
    pub events_pending: i64,
    pub sources_tracked: usize,
}

/// Application state for health endpoints
#[derive(Clone)]
pub struct AppState {
    pub outlet: Arc<Outlet>,
    pub nats: Option<Arc<NatsSink>>,
    pub pending: Arc<PendingCounter>,
    pub registry: Arc<Registry>,
    pub metrics: OutletMetrics,
}

/// Create the health check router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint - returns 200 while the outlet accepts events and
/// the NATS client (if any) is connected
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let outlet_open = state.outlet.is_open();
    let nats_connected = state.nats.as_ref().map_or(true, |n| n.is_connected());

    let response = ReadyResponse {
        ready: outlet_open && nats_connected,
        outlet_open,
        nats_connected,
        events_pending: state.pending.pending(),
        sources_tracked: state.registry.len(),
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.set_open(state.outlet.is_open());
    state.metrics.set_pending(state.pending.pending());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}
