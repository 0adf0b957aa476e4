//! Worker metrics: a `PrometheusBuilder` installation and `pub mod names`
//! constant-name convention, with counters for each pipeline stage.
//!
//! The JSON metrics endpoint needs a schema Prometheus text exposition
//! doesn't give us, so every increment also lands in an in-process
//! `DashMap<String, AtomicU64>` snapshot read by `vod-api`'s metrics handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use serde::Serialize;

/// Metric names as constants for consistency.
pub mod names {
    pub const DOWNLOAD_ATTEMPT: &str = "download.attempt";
    pub const DOWNLOAD_SUCCESS: &str = "download.success";
    pub const DOWNLOAD_FAILED: &str = "download.failed";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "download.duration_seconds";
    pub const PIPELINE_START: &str = "pipeline.start";
    pub const PIPELINE_DONE: &str = "pipeline.done";
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    pub const PIPELINE_DEFERRED: &str = "pipeline.deferred";
    pub const AUTOPRIORITIZE_SCANNED: &str = "autoprioritize.scanned";
    pub const AUTOPRIORITIZE_ENQUEUED: &str = "autoprioritize.enqueued";
    pub const AUTOPRIORITIZE_SKIPPED_CAPTIONED: &str = "autoprioritize.skipped_captioned";
    pub const AUTOPRIORITIZE_SKIPPED_ALREADYQUEUED: &str = "autoprioritize.skipped_alreadyqueued";
}

/// Process-wide counter snapshot, mirrored alongside the `metrics` crate's
/// own recorder at every increment.
static SNAPSHOT: Lazy<Arc<DashMap<String, AtomicU64>>> = Lazy::new(|| Arc::new(DashMap::new()));
static CITY_ENQUEUED: Lazy<Arc<DashMap<String, AtomicU64>>> = Lazy::new(|| Arc::new(DashMap::new()));

/// Installs the Prometheus recorder; call once at binary startup.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Central increment helper: the single write site for both the
/// Prometheus counter and the JSON snapshot, keeping the two in sync.
pub fn record_counter(name: &'static str) {
    counter!(name).increment(1);
    SNAPSHOT
        .entry(name.to_string())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

/// Records a timed duration, e.g. a download's wall-clock time, under the
/// Prometheus histogram recorder. Not mirrored into the JSON snapshot: a
/// histogram's buckets don't fit the snapshot's flat counter shape.
pub fn record_duration_seconds(name: &'static str, elapsed: std::time::Duration) {
    histogram!(name).record(elapsed.as_secs_f64());
}

/// Records a per-city autoprioritize enqueue, both under the flat counter
/// name and the `autoprioritize.enqueued.<city>` label.
pub fn record_city_enqueued(city_id: &str) {
    record_counter(names::AUTOPRIORITIZE_ENQUEUED);
    let labels = [("city", city_id.to_string())];
    counter!(format!("{}.{city_id}", names::AUTOPRIORITIZE_ENQUEUED), &labels).increment(1);
    CITY_ENQUEUED
        .entry(city_id.to_string())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub counters: std::collections::BTreeMap<String, u64>,
    pub city_enqueued_total: std::collections::BTreeMap<String, u64>,
}

/// The JSON metrics endpoint payload.
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        timestamp: chrono::Utc::now().to_rfc3339(),
        counters: SNAPSHOT
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect(),
        city_enqueued_total: CITY_ENQUEUED
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments_are_additive() {
        record_counter(names::DOWNLOAD_ATTEMPT);
        record_counter(names::DOWNLOAD_ATTEMPT);
        let snap = snapshot();
        assert!(snap.counters[names::DOWNLOAD_ATTEMPT] >= 2);
    }

    #[test]
    fn city_enqueued_tracked_per_city() {
        record_city_enqueued("flex3");
        let snap = snapshot();
        assert!(snap.city_enqueued_total["flex3"] >= 1);
    }
}
