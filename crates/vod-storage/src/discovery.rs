//! Discovery scanner: flex-mount video enumeration.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;
use vod_models::{candidate_sort_key, CityId, VideoCandidate};

use crate::registry::is_mountpoint;

/// Fixed set of content subdirectories scanned alongside the mount root.
pub const CONTENT_SUBDIRS: &[&str] = &[
    "videos",
    "vod_content",
    "city_council",
    "meetings",
    "content",
    "incoming",
    "recordings",
];

/// Scans `mount_path` and its known content subdirectories (depth 1 only)
/// for video candidates, returning up to `limit` ordered newest-first.
///
/// Never fails: an unmounted or unreadable mount yields an empty vector and
/// a warning, matching the graceful-degradation posture of the original
/// mount-checking script.
pub fn scan_mount(mount_path: &Path, city_id: &CityId, limit: usize) -> Vec<VideoCandidate> {
    if !is_mountpoint(mount_path) {
        warn!(mount = %mount_path.display(), "mount path is not a mountpoint, skipping discovery");
        return Vec::new();
    }

    let mut candidates = Vec::new();
    scan_dir(mount_path, city_id, &mut candidates);
    for subdir in CONTENT_SUBDIRS {
        scan_dir(&mount_path.join(subdir), city_id, &mut candidates);
    }

    candidates.sort_by_key(candidate_sort_key);
    candidates.truncate(limit);
    candidates
}

fn scan_dir(dir: &Path, city_id: &CityId, out: &mut Vec<VideoCandidate>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if dir.exists() {
                warn!(dir = %dir.display(), error = %e, "could not read directory, skipping");
            }
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let recorded_at: DateTime<Utc> = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        if let Some(candidate) = VideoCandidate::new(path, city_id.clone(), recorded_at, meta.len()) {
            out.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn city() -> CityId {
        CityId::new("flex3")
    }

    #[test]
    fn non_mountpoint_yields_empty() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("not-a-mount");
        std::fs::create_dir(&nested).unwrap();
        assert!(scan_mount(&nested, &city(), 10).is_empty());
    }

    #[test]
    fn unreadable_subdir_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        scan_dir(&dir.path().join("does-not-exist"), &city(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn filters_by_size_and_extension() {
        let dir = tempdir().unwrap();
        let small = dir.path().join("tiny.mp4");
        let mut f = File::create(&small).unwrap();
        f.write_all(&[0u8; 1024]).unwrap();

        let mut out = Vec::new();
        scan_dir(dir.path(), &city(), &mut out);
        assert!(out.is_empty());
    }
}
