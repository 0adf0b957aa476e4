//! VOD client metrics collection.
//!
//! Standardized metrics for monitoring VOD upstream calls: request counters
//! by operation and status, latency histograms, retry counters.

use metrics::{counter, histogram};

pub mod names {
    pub const REQUESTS_TOTAL: &str = "vod_client_requests_total";
    pub const RETRIES_TOTAL: &str = "vod_client_retries_total";
    pub const LATENCY_SECONDS: &str = "vod_client_latency_seconds";
}

pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    let status_str = status.to_string();

    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_str
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_namespaced() {
        assert!(names::REQUESTS_TOTAL.starts_with("vod_client_"));
        assert!(names::RETRIES_TOTAL.starts_with("vod_client_"));
        assert!(names::LATENCY_SECONDS.starts_with("vod_client_"));
    }
}
