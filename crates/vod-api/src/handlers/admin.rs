//! Operator trigger endpoints: manual enqueue of the city-scoped maintenance
//! tasks, and a broker queue-depth snapshot. No end-user auth surface —
//! this API is operator-only.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use vod_models::{QueueName, TaskEnvelope, TaskKind};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub task_id: String,
    pub message: String,
}

async fn enqueue(state: &AppState, kind: TaskKind, queue: QueueName) -> ApiResult<TriggerResponse> {
    let name = kind.name();
    let envelope = TaskEnvelope::new(kind, queue);
    let task_id = envelope.id.to_string();
    state.broker.enqueue(envelope).await?;

    info!(task = name, task_id = %task_id, "operator-triggered task enqueued");

    Ok(TriggerResponse {
        success: true,
        task_id,
        message: format!("{name} enqueued"),
    })
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    #[serde(default)]
    pub priority: bool,
}

/// Manually trigger `discover.all_cities`.
pub async fn trigger_discover(
    State(state): State<AppState>,
    Json(request): Json<DiscoverRequest>,
) -> ApiResult<Json<TriggerResponse>> {
    let queue = if request.priority { QueueName::Priority } else { QueueName::Default };
    let response = enqueue(&state, TaskKind::DiscoverAllCities { priority: request.priority }, queue).await?;
    Ok(Json(response))
}

/// Manually trigger `maintenance.backfill`.
pub async fn trigger_backfill(State(state): State<AppState>) -> ApiResult<Json<TriggerResponse>> {
    let response = enqueue(&state, TaskKind::MaintenanceBackfill, QueueName::Default).await?;
    Ok(Json(response))
}

/// Manually trigger `maintenance.cleanup_temp`.
pub async fn trigger_cleanup(State(state): State<AppState>) -> ApiResult<Json<TriggerResponse>> {
    let response = enqueue(&state, TaskKind::MaintenanceCleanupTemp, QueueName::Default).await?;
    Ok(Json(response))
}

/// Manually trigger `health.aggregate`.
pub async fn trigger_health_aggregate(State(state): State<AppState>) -> ApiResult<Json<TriggerResponse>> {
    let response = enqueue(&state, TaskKind::HealthAggregate, QueueName::Default).await?;
    Ok(Json(response))
}

/// Queue status response.
#[derive(Serialize)]
pub struct QueueStatusResponse {
    pub priority_queue_length: u64,
    pub default_queue_length: u64,
    pub dlq_length: u64,
}

pub async fn get_queue_status(State(state): State<AppState>) -> ApiResult<Json<QueueStatusResponse>> {
    let priority_queue_length = state.broker.len(QueueName::Priority).await.unwrap_or(0);
    let default_queue_length = state.broker.len(QueueName::Default).await.unwrap_or(0);
    let dlq_length = state.broker.dlq_len().await.unwrap_or(0);

    crate::metrics::set_queue_lengths(priority_queue_length, default_queue_length, dlq_length);

    Ok(Json(QueueStatusResponse {
        priority_queue_length,
        default_queue_length,
        dlq_length,
    }))
}
