//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{get_queue_status, health, metrics_snapshot, ready, trigger_backfill, trigger_cleanup, trigger_discover, trigger_health_aggregate};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, prometheus_handle: Option<PrometheusHandle>) -> Router {
    let admin_routes = Router::new()
        .route("/admin/tasks/discover", post(trigger_discover))
        .route("/admin/tasks/backfill", post(trigger_backfill))
        .route("/admin/tasks/cleanup", post(trigger_cleanup))
        .route("/admin/tasks/health", post(trigger_health_aggregate))
        .route("/admin/queue/status", get(get_queue_status));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = Router::new().route("/metrics/json", get(metrics_snapshot));

    let prometheus_route = if let Some(handle) = prometheus_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", admin_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(prometheus_route)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
