//! Health and readiness handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vod_worker::health::{run_health_checks, CheckState, HealthReport};

use crate::state::AppState;

/// Health response (liveness probe, no dependency checks).
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint, running the health aggregator against the
/// mounts, broker, and VOD upstream.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    let cities: Vec<_> = state.cities.values().cloned().collect();
    let report = run_health_checks(&cities, &state.broker, &state.client).await;

    if report.status == CheckState::Unhealthy {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(report)))
    } else {
        Ok(Json(report))
    }
}
