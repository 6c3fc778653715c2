//! Exporter and control handlers

use super::AppState;
use crate::control;
use crate::reading::Reading;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{Html, IntoResponse, Json, Response},
};
use chrono::Utc;
use common::{AppError, ComponentHealth, HealthStatus, ServiceStatus, SuccessResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

const INDEX_HTML: &str = r#"<html>
<head><title>AC Power Monitor</title></head>
<body>
    <h1>AC Power Monitor</h1>
    <p>This is a Prometheus exporter for AC power monitoring data.</p>
    <p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Body of `PUT /api/threshold`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdRequest {
    pub watts: u16,
}

/// Result of a control action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResult {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u16>,
}

/// Index page
///
/// @route GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Prometheus scrape endpoint
///
/// @route GET /metrics
/// @status 200 - text exposition format
/// @status 500 - encoding failed
pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.cache.snapshot();
    let body = state.metrics.render(&snapshot, &state.stats)?;

    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

/// Health check endpoint
///
/// @route GET /health
/// @output `Json<SuccessResponse<HealthStatus>>` - service and meter status
pub async fn health_check(State(state): State<AppState>) -> Json<SuccessResponse<HealthStatus>> {
    let now = Utc::now();
    let uptime_seconds: u64 = (now - state.started_at)
        .num_seconds()
        .max(0)
        .try_into()
        .unwrap_or(0);

    let snapshot = state.cache.snapshot();
    let streak = state.stats.failure_streak();
    let meter_status = match (snapshot.is_captured(), streak) {
        (true, 0) => ServiceStatus::Healthy,
        (true, _) => ServiceStatus::Degraded,
        (false, 0) => ServiceStatus::Unknown,
        (false, _) => ServiceStatus::Unhealthy,
    };

    let mut meter = ComponentHealth::new(meter_status);
    if let Some(err) = state.stats.last_error() {
        meter = meter.with_message(format!("{} consecutive failures: {}", streak, err));
    }

    let mut checks = HashMap::new();
    checks.insert("meter".to_string(), meter);

    let health = HealthStatus {
        status: meter_status,
        service: state.service_name.clone(),
        version: state.version.clone(),
        uptime_seconds,
        timestamp: now,
        checks,
    };

    let last_reading_age = snapshot
        .is_captured()
        .then(|| (now - snapshot.captured_at).num_seconds().max(0));

    Json(
        SuccessResponse::new(health)
            .with_metadata("polls_succeeded", state.stats.successes().into())
            .with_metadata("polls_failed", state.stats.failures().into())
            .with_metadata("last_reading_age_seconds", last_reading_age.into()),
    )
}

/// Latest cached reading
///
/// @route GET /api/reading
pub async fn get_reading(State(state): State<AppState>) -> Json<SuccessResponse<Reading>> {
    Json(SuccessResponse::new(state.cache.snapshot()))
}

/// Write the alarm threshold holding register
///
/// @route PUT /api/threshold
/// @input Json(ThresholdRequest) - `{"watts": <u16>}`
/// @status 200 - written; cache threshold updated immediately
/// @status 400 - malformed body
/// @status 502 - meter rejected or did not answer
pub async fn set_threshold(
    State(state): State<AppState>,
    payload: Result<Json<ThresholdRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<ControlResult>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    control::set_alarm_threshold(
        &state.client,
        &state.cache,
        state.threshold_address,
        request.watts,
    )
    .await
    .inspect_err(|e| warn!("Threshold write failed: {}", e))?;

    Ok(Json(SuccessResponse::new(ControlResult {
        action: "set_threshold".to_string(),
        value: Some(request.watts),
    })))
}

/// Zero the cumulative energy counter
///
/// @route POST /api/energy/reset
/// @status 200 - acknowledged by the meter
/// @status 502 - meter rejected or did not answer
pub async fn reset_energy(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<ControlResult>>, AppError> {
    control::reset_energy(&state.client)
        .await
        .inspect_err(|e| warn!("Energy reset failed: {}", e))?;

    Ok(Json(SuccessResponse::new(ControlResult {
        action: "reset_energy".to_string(),
        value: None,
    })))
}
