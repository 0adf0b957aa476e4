//! Health aggregator: a three-way `CheckState` pattern (healthy, degraded,
//! unhealthy) applied to per-city mount status, broker reachability, VOD
//! client reachability, worker liveness, and per-mount disk usage.

use std::time::{Duration, Instant};

use serde::Serialize;
use vod_broker::TaskBroker;
use vod_client::VodClient;
use vod_models::CityDescriptor;
use vod_storage::{is_mountpoint, is_writable};

/// Disk usage at or above this percentage degrades a mount check.
const DISK_DEGRADED_THRESHOLD_PCT: f64 = 85.0;

/// Heartbeat key touched by the executor each consume loop; staleness past
/// this age means no active worker.
const HEARTBEAT_KEY: &str = "vod:worker:heartbeat";
const HEARTBEAT_STALE_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckState, detail: Option<String>, started: Instant) -> Self {
        Self {
            name: name.into(),
            status,
            detail,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: CheckState,
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    fn rollup(checks: Vec<CheckResult>) -> Self {
        let status = if checks.iter().any(|c| c.status == CheckState::Unhealthy) {
            CheckState::Unhealthy
        } else if checks.iter().any(|c| c.status == CheckState::Degraded) {
            CheckState::Degraded
        } else {
            CheckState::Healthy
        };
        Self { status, checks }
    }
}

/// Runs the full check set: per-city mount status, broker
/// reachability, VOD client reachability, worker liveness, and per-mount
/// disk usage.
pub async fn run_health_checks(
    cities: &[CityDescriptor],
    broker: &TaskBroker,
    client: &VodClient,
) -> HealthReport {
    let mut checks = Vec::new();

    for city in cities {
        checks.push(check_mount(city));
        if let Some(disk_check) = check_disk_usage(city) {
            checks.push(disk_check);
        }
    }

    checks.push(check_broker(broker).await);
    checks.push(check_vod_client(client).await);
    checks.push(check_worker_liveness(broker).await);

    HealthReport::rollup(checks)
}

fn check_mount(city: &CityDescriptor) -> CheckResult {
    let started = Instant::now();
    let mounted = is_mountpoint(&city.mount_path);
    if !mounted {
        return CheckResult::new(
            format!("mount:{}", city.id),
            CheckState::Unhealthy,
            Some("mount missing".to_string()),
            started,
        );
    }
    if !is_writable(&city.mount_path) {
        return CheckResult::new(
            format!("mount:{}", city.id),
            CheckState::Degraded,
            Some("mount not writable".to_string()),
            started,
        );
    }
    CheckResult::new(format!("mount:{}", city.id), CheckState::Healthy, None, started)
}

/// Disk-usage percentage via `statvfs`. Returns `None` if the platform call
/// fails — absence of this check does not make the rollup unhealthy.
fn check_disk_usage(city: &CityDescriptor) -> Option<CheckResult> {
    let started = Instant::now();
    let pct = crate::platform::disk_used_percent(&city.mount_path)?;
    let status = if pct >= DISK_DEGRADED_THRESHOLD_PCT {
        CheckState::Degraded
    } else {
        CheckState::Healthy
    };
    Some(CheckResult::new(
        format!("disk:{}", city.id),
        status,
        Some(format!("{pct:.1}% used")),
        started,
    ))
}

async fn check_broker(broker: &TaskBroker) -> CheckResult {
    let started = Instant::now();
    match broker.len(vod_models::QueueName::Default).await {
        Ok(_) => CheckResult::new("broker", CheckState::Healthy, None, started),
        Err(e) => CheckResult::new("broker", CheckState::Unhealthy, Some(e.to_string()), started),
    }
}

async fn check_vod_client(client: &VodClient) -> CheckResult {
    let started = Instant::now();
    match client.test_reachability().await {
        Ok(true) => CheckResult::new("vod_client", CheckState::Healthy, None, started),
        Ok(false) => CheckResult::new(
            "vod_client",
            CheckState::Degraded,
            Some("non-2xx response".to_string()),
            started,
        ),
        Err(e) => CheckResult::new("vod_client", CheckState::Unhealthy, Some(e.to_string()), started),
    }
}

async fn check_worker_liveness(broker: &TaskBroker) -> CheckResult {
    let started = Instant::now();
    let mut conn = match broker.redis_client().get_multiplexed_async_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("worker_liveness", CheckState::Unhealthy, Some(e.to_string()), started)
        }
    };

    use redis::AsyncCommands;
    let ttl: i64 = conn.ttl(HEARTBEAT_KEY).await.unwrap_or(-2);
    if ttl > 0 {
        CheckResult::new("worker_liveness", CheckState::Healthy, None, started)
    } else {
        CheckResult::new(
            "worker_liveness",
            CheckState::Unhealthy,
            Some("no active worker heartbeat".to_string()),
            started,
        )
    }
}

/// Touches the heartbeat key; called by the executor each consume loop.
pub async fn touch_heartbeat(broker: &TaskBroker) {
    if let Ok(mut conn) = broker.redis_client().get_multiplexed_async_connection().await {
        use redis::AsyncCommands;
        let ttl = HEARTBEAT_STALE_AFTER.as_secs();
        let _: Result<(), redis::RedisError> = conn.set_ex(HEARTBEAT_KEY, "1", ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_is_unhealthy_if_any_check_unhealthy() {
        let checks = vec![
            CheckResult {
                name: "a".to_string(),
                status: CheckState::Healthy,
                detail: None,
                latency_ms: 0,
            },
            CheckResult {
                name: "b".to_string(),
                status: CheckState::Unhealthy,
                detail: None,
                latency_ms: 0,
            },
        ];
        assert_eq!(HealthReport::rollup(checks).status, CheckState::Unhealthy);
    }

    #[test]
    fn rollup_is_degraded_when_only_degraded_present() {
        let checks = vec![CheckResult {
            name: "a".to_string(),
            status: CheckState::Degraded,
            detail: None,
            latency_ms: 0,
        }];
        assert_eq!(HealthReport::rollup(checks).status, CheckState::Degraded);
    }

    #[test]
    fn rollup_is_healthy_when_all_healthy() {
        let checks = vec![CheckResult {
            name: "a".to_string(),
            status: CheckState::Healthy,
            detail: None,
            latency_ms: 0,
        }];
        assert_eq!(HealthReport::rollup(checks).status, CheckState::Healthy);
    }
}
