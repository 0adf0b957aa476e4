//! Caption predicate: has this video already been captioned?

use std::path::{Path, PathBuf};

/// Sibling directory names checked, in order, after the adjacent location.
pub const CAPTION_SIBLING_DIRS: &[&str] = &["transcriptions", "scc_files", "captions"];

/// Known caption artifact extensions, checked in order for each candidate location.
pub const CAPTION_EXTENSIONS: &[&str] = &["scc", "srt", "vtt"];

/// True if a caption artifact already exists for `video_path`, checked
/// adjacent, then in each sibling directory, then in `global_output_dir`.
/// First match wins; any read error or absence is treated as false.
pub fn has_caption(video_path: &Path, global_output_dir: Option<&Path>) -> bool {
    let Some(basename) = video_path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(parent) = video_path.parent() else {
        return false;
    };

    if caption_exists_in(parent, basename) {
        return true;
    }

    for sibling in CAPTION_SIBLING_DIRS {
        if caption_exists_in(&parent.join(sibling), basename) {
            return true;
        }
    }

    if let Some(global) = global_output_dir {
        if caption_exists_in(global, basename) {
            return true;
        }
    }

    false
}

fn caption_exists_in(dir: &Path, basename: &str) -> bool {
    CAPTION_EXTENSIONS
        .iter()
        .any(|ext| candidate_path(dir, basename, ext).is_file())
}

fn candidate_path(dir: &Path, basename: &str, ext: &str) -> PathBuf {
    dir.join(format!("{basename}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};
    use tempfile::tempdir;

    #[test]
    fn finds_adjacent_caption() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("meeting.mp4");
        File::create(&video).unwrap();
        File::create(dir.path().join("meeting.scc")).unwrap();
        assert!(has_caption(&video, None));
    }

    #[test]
    fn finds_sibling_directory_caption() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("meeting.mp4");
        File::create(&video).unwrap();
        let sibling = dir.path().join("transcriptions");
        create_dir_all(&sibling).unwrap();
        File::create(sibling.join("meeting.scc")).unwrap();
        assert!(has_caption(&video, None));
    }

    #[test]
    fn falls_back_to_global_output_dir() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("meeting.mp4");
        File::create(&video).unwrap();
        let global = tempdir().unwrap();
        File::create(global.path().join("meeting.srt")).unwrap();
        assert!(has_caption(&video, Some(global.path())));
    }

    #[test]
    fn absence_is_false() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("meeting.mp4");
        File::create(&video).unwrap();
        assert!(!has_caption(&video, None));
    }
}
