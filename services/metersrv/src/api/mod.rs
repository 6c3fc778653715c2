//! HTTP surface: Prometheus exporter, health and control API

pub mod handlers;

use crate::cache::TelemetryCache;
use crate::metrics::MeterMetrics;
use crate::poller::{PollerStats, SharedClient};
use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub client: SharedClient,
    pub cache: Arc<TelemetryCache>,
    pub stats: Arc<PollerStats>,
    pub metrics: Arc<MeterMetrics>,
    /// Holding register written by `PUT /api/threshold`
    pub threshold_address: u16,
    pub service_name: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

/// Build the service router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health_check))
        .route("/api/reading", get(handlers::get_reading))
        .route("/api/threshold", put(handlers::set_threshold))
        .route("/api/energy/reset", post(handlers::reset_energy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
