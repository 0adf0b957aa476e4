//! Small platform helper for the health aggregator's disk-usage check.

use std::path::Path;

use sysinfo::Disks;

/// Percentage of disk space used at the mount containing `path`, matched by
/// the longest mount-point prefix. Returns `None` if no disk covers `path`.
pub fn disk_used_percent(path: &Path) -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .and_then(|disk| {
            let total = disk.total_space();
            if total == 0 {
                return None;
            }
            let used = total.saturating_sub(disk.available_space());
            Some(used as f64 / total as f64 * 100.0)
        })
}
