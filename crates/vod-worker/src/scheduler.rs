//! Periodic scheduler: fires the six named tasks on wall-clock cron
//! points, checked against a tokio interval tick rather than fixed-period
//! ticks alone.
//!
//! Six wall-clock registrations, avoiding a duplicate ad hoc 19:00
//! "process_recent_vods" entry by keeping exactly the six-entry table,
//! including both autoprioritize fires.

use std::time::Duration;

use chrono::{Timelike, Utc};
use tracing::info;
use vod_models::TaskKind;

use crate::config::WorkerConfig;

/// One scheduled entry: either a `hour:minute` wall-clock fire or a fixed
/// `every` period. Exactly one of `hour`/`minute` or `every` is set.
#[derive(Debug, Clone)]
pub struct CronEntry {
    pub name: &'static str,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub every: Option<Duration>,
    pub task: TaskKind,
    last_fired_minute: Option<i64>,
}

impl CronEntry {
    fn wall_clock(name: &'static str, hour: u32, minute: u32, task: TaskKind) -> Self {
        Self {
            name,
            hour: Some(hour),
            minute: Some(minute),
            every: None,
            task,
            last_fired_minute: None,
        }
    }

    fn every(name: &'static str, every: Duration, task: TaskKind) -> Self {
        Self {
            name,
            hour: None,
            minute: None,
            every: Some(every),
            task,
            last_fired_minute: None,
        }
    }

    /// Whether this entry should fire at `now`, given the minute index
    /// (minutes since epoch) of the last tick. A `wall_clock` entry fires
    /// once per matching minute; an `every` entry fires once per elapsed
    /// period, tracked in the same minute-index units so a missed tick
    /// during an outage is never replayed — it simply resumes from "now".
    fn should_fire(&self, now_minute_index: i64, hour: u32, minute: u32) -> bool {
        if let (Some(h), Some(m)) = (self.hour, self.minute) {
            return h == hour && m == minute && self.last_fired_minute != Some(now_minute_index);
        }
        if let Some(every) = self.every {
            let period_minutes = (every.as_secs() / 60).max(1) as i64;
            return match self.last_fired_minute {
                None => true,
                Some(last) => now_minute_index - last >= period_minutes,
            };
        }
        false
    }
}

/// The six-entry schedule, reading `DISCOVERY_TIME_MORNING`/`_EVENING`
/// overrides from `config`.
pub struct Scheduler {
    entries: Vec<CronEntry>,
}

impl Scheduler {
    pub fn new(config: &WorkerConfig) -> Self {
        let (morning_h, morning_m) = config.discovery_time_morning;
        let (evening_h, evening_m) = config.discovery_time_evening;

        let entries = vec![
            CronEntry::wall_clock(
                "daily-discovery",
                4,
                0,
                TaskKind::DiscoverAllCities { priority: false },
            ),
            CronEntry::wall_clock(
                "autoprioritize-morning",
                morning_h,
                morning_m,
                TaskKind::DiscoverAllCities { priority: true },
            ),
            CronEntry::wall_clock(
                "autoprioritize-evening",
                evening_h,
                evening_m,
                TaskKind::DiscoverAllCities { priority: true },
            ),
            CronEntry::every(
                "backfill",
                Duration::from_secs(30 * 60),
                TaskKind::MaintenanceBackfill,
            ),
            CronEntry::wall_clock("cleanup", 2, 30, TaskKind::MaintenanceCleanupTemp),
            CronEntry::every(
                "health",
                Duration::from_secs(5 * 60),
                TaskKind::HealthAggregate,
            ),
        ];

        Self { entries }
    }

    /// Runs the 60s tick loop, invoking `on_fire` for each entry whose
    /// condition matches this tick. Never returns under normal operation.
    pub async fn run(&mut self, mut on_fire: impl FnMut(&TaskKind, &str)) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            self.tick(&mut on_fire);
        }
    }

    fn tick(&mut self, on_fire: &mut impl FnMut(&TaskKind, &str)) {
        let now = Utc::now();
        let now_minute_index = now.timestamp() / 60;
        let hour = now.hour();
        let minute = now.minute();

        for entry in &mut self.entries {
            if entry.should_fire(now_minute_index, hour, minute) {
                info!(entry = entry.name, "scheduler firing entry");
                on_fire(&entry.task, entry.name);
                entry.last_fired_minute = Some(now_minute_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_entry_fires_once_per_matching_minute() {
        let mut entry = CronEntry::wall_clock("x", 4, 0, TaskKind::MaintenanceCleanupTemp);
        assert!(entry.should_fire(100, 4, 0));
        entry.last_fired_minute = Some(100);
        assert!(!entry.should_fire(100, 4, 0));
        assert!(!entry.should_fire(101, 4, 1));
    }

    #[test]
    fn every_entry_fires_after_period_elapses() {
        let mut entry = CronEntry::every("x", Duration::from_secs(30 * 60), TaskKind::MaintenanceBackfill);
        assert!(entry.should_fire(0, 0, 0));
        entry.last_fired_minute = Some(0);
        assert!(!entry.should_fire(10, 0, 10));
        assert!(entry.should_fire(30, 0, 30));
    }

    #[test]
    fn missed_tick_is_not_replayed() {
        // A long worker outage leaves last_fired far behind; the next tick
        // fires once, not once per missed period.
        let mut entry = CronEntry::every("x", Duration::from_secs(5 * 60), TaskKind::HealthAggregate);
        entry.last_fired_minute = Some(0);
        let mut fired = 0;
        if entry.should_fire(1000, 0, 0) {
            fired += 1;
            entry.last_fired_minute = Some(1000);
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn six_entries_match_the_spec_table() {
        let config = WorkerConfig::default();
        let scheduler = Scheduler::new(&config);
        assert_eq!(scheduler.entries.len(), 6);
    }
}
