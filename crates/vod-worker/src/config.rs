//! Worker configuration.

use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration: the ambient knobs plus the two required keys.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent pipeline tasks (default 2-4).
    pub max_concurrent_jobs: usize,
    /// Graceful shutdown timeout.
    pub shutdown_timeout: Duration,
    /// Work directory for temporary downloads.
    pub work_dir: String,
    /// How often the worker scans for orphaned pending tasks.
    pub claim_interval: Duration,
    /// Minimum idle time before a pending task can be claimed (crash recovery).
    pub claim_min_idle: Duration,
    /// Interval for touching the worker-liveness heartbeat key.
    pub job_heartbeat_interval: Duration,
    /// `BROKER_URL` (required).
    pub broker_url: String,
    /// `CITIES_CONFIG` (required).
    pub cities_config: String,
    /// `DISCOVERY_TIME_MORNING`, default 07:00.
    pub discovery_time_morning: (u32, u32),
    /// `DISCOVERY_TIME_EVENING`, default 19:00.
    pub discovery_time_evening: (u32, u32),
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/vod_downloads".to_string(),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
            job_heartbeat_interval: Duration::from_secs(30),
            broker_url: "redis://localhost:6379".to_string(),
            cities_config: String::new(),
            discovery_time_morning: (7, 0),
            discovery_time_evening: (19, 0),
        }
    }
}

impl WorkerConfig {
    /// Builds config from environment variables. Fails with
    /// `WorkerError::ConfigError` if `BROKER_URL` or `CITIES_CONFIG` is
    /// absent.
    pub fn from_env() -> WorkerResult<Self> {
        let broker_url = std::env::var("BROKER_URL")
            .map_err(|_| WorkerError::config_error("BROKER_URL is required"))?;
        let cities_config = std::env::var("CITIES_CONFIG")
            .map_err(|_| WorkerError::config_error("CITIES_CONFIG is required"))?;

        Ok(Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/vod_downloads".to_string()),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            job_heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_JOB_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            broker_url,
            cities_config,
            discovery_time_morning: parse_hhmm("DISCOVERY_TIME_MORNING", (7, 0)),
            discovery_time_evening: parse_hhmm("DISCOVERY_TIME_EVENING", (19, 0)),
        })
    }
}

/// Parses an `HH:MM` env var, falling back to `default` and logging on a
/// malformed value.
fn parse_hhmm(var: &str, default: (u32, u32)) -> (u32, u32) {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };
    match raw.split_once(':') {
        Some((h, m)) => match (h.parse::<u32>(), m.parse::<u32>()) {
            (Ok(h), Ok(m)) if h < 24 && m < 60 => (h, m),
            _ => {
                tracing::error!(var, value = %raw, "invalid HH:MM format, using default");
                default
            }
        },
        None => {
            tracing::error!(var, value = %raw, "invalid HH:MM format, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_discovery_times_match_spec() {
        let config = WorkerConfig::default();
        assert_eq!(config.discovery_time_morning, (7, 0));
        assert_eq!(config.discovery_time_evening, (19, 0));
    }
}
