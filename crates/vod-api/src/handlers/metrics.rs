//! JSON metrics snapshot handler — a shape the Prometheus text exposition
//! can't carry (`{timestamp, counters, city_enqueued_total}`).

use axum::Json;
use vod_worker::metrics::{snapshot, MetricsSnapshot};

pub async fn metrics_snapshot() -> Json<MetricsSnapshot> {
    Json(snapshot())
}
