//! Prometheus metrics for the API server's own HTTP surface.
//!
//! This is distinct from `vod_worker::metrics`'s pipeline counters: this
//! module only tracks the API process's request volume and the broker queue
//! depths it surfaces to operators.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder. Returns a handle that renders
/// the text exposition.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vod_api_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vod_api_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vod_api_http_requests_in_flight";
    pub const QUEUE_LENGTH: &str = "vod_api_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "vod_api_queue_dlq_length";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update broker queue length gauges, read by the readiness/queue-status handlers.
pub fn set_queue_lengths(priority_len: u64, default_len: u64, dlq_len: u64) {
    let priority_labels = [("queue", "priority")];
    let default_labels = [("queue", "default")];
    gauge!(names::QUEUE_LENGTH, &priority_labels).set(priority_len as f64);
    gauge!(names::QUEUE_LENGTH, &default_labels).set(default_len as f64);
    gauge!(names::QUEUE_DLQ_LENGTH).set(dlq_len as f64);
}

/// Sanitize path for metrics labels (collapse video/city ids to a placeholder).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/videos/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(path, "/videos/:video_id");
    let path = regex_lite::Regex::new(r"/cities/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(&path, "/cities/:city_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();
    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/videos/flex_flex3_0/clips"),
            "/api/videos/:video_id/clips"
        );
        assert_eq!(sanitize_path("/api/cities/flex3/status"), "/api/cities/:city_id/status");
    }
}
