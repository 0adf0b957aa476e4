//! Video candidates discovered on a flex mount.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::city::CityId;

/// Minimum size, in bytes, for a file to be considered a video candidate.
pub const MIN_CANDIDATE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Extensions recognized as video content, lower-cased, including the leading dot.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mov", ".mkv", ".m4v", ".avi", ".ts", ".wmv", ".mpeg",
];

/// A video file discovered by the scanner that meets the size/extension invariants.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub path: PathBuf,
    pub city_id: CityId,
    /// Recording time, taken from filesystem mtime.
    pub recorded_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Lower-cased extension including the leading dot, e.g. ".mp4".
    pub extension: String,
}

impl VideoCandidate {
    /// Construct a candidate, rejecting anything that violates the size/extension invariants.
    pub fn new(
        path: PathBuf,
        city_id: CityId,
        recorded_at: DateTime<Utc>,
        size_bytes: u64,
    ) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))?;

        let candidate = Self {
            path,
            city_id,
            recorded_at,
            size_bytes,
            extension,
        };

        if candidate.is_valid() {
            Some(candidate)
        } else {
            None
        }
    }

    /// Size >= 5 MiB and extension in the known set.
    pub fn is_valid(&self) -> bool {
        self.size_bytes >= MIN_CANDIDATE_SIZE_BYTES
            && VIDEO_EXTENSIONS.contains(&self.extension.as_str())
    }

    /// Basename without extension, used to derive sibling caption/output file names.
    pub fn basename(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Ordering key for newest-first, lexicographic-tie-break sorting.
pub fn candidate_sort_key(candidate: &VideoCandidate) -> (std::cmp::Reverse<DateTime<Utc>>, PathBuf) {
    (std::cmp::Reverse(candidate.recorded_at), candidate.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city() -> CityId {
        CityId::new("flex3")
    }

    #[test]
    fn rejects_undersized_file() {
        let undersized = VideoCandidate::new(
            PathBuf::from("/mnt/flex-3/show.mp4"),
            city(),
            Utc::now(),
            MIN_CANDIDATE_SIZE_BYTES - 1,
        );
        assert!(undersized.is_none());
    }

    #[test]
    fn accepts_exact_boundary_size() {
        let exact = VideoCandidate::new(
            PathBuf::from("/mnt/flex-3/show.mp4"),
            city(),
            Utc::now(),
            MIN_CANDIDATE_SIZE_BYTES,
        );
        assert!(exact.is_some());
    }

    #[test]
    fn rejects_unknown_extension() {
        let bad_ext = VideoCandidate::new(
            PathBuf::from("/mnt/flex-3/show.txt"),
            city(),
            Utc::now(),
            100 * 1024 * 1024,
        );
        assert!(bad_ext.is_none());
    }

    #[test]
    fn sort_key_breaks_ties_lexicographically() {
        let t = Utc::now();
        let a = VideoCandidate::new(PathBuf::from("/mnt/flex-3/a.mp4"), city(), t, 10 * 1024 * 1024).unwrap();
        let b = VideoCandidate::new(PathBuf::from("/mnt/flex-3/b.mp4"), city(), t, 10 * 1024 * 1024).unwrap();
        let mut v = vec![b.clone(), a.clone()];
        v.sort_by_key(candidate_sort_key);
        assert_eq!(v[0].path, a.path);
        assert_eq!(v[1].path, b.path);
    }
}
