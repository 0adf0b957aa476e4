#![deny(unreachable_patterns)]
//! Media tooling for the Archivist pipeline.
//!
//! This crate provides:
//! - A resilient, `reqwest`-streaming downloader
//! - `ffprobe`-backed video introspection for the VALIDATE stage
//! - An opaque transcriber subprocess wrapper for the TRANSCRIBE stage
//! - An opaque `ffmpeg` remux wrapper for the REMUX stage
//! - Cross-device-safe file moves for placing produced artifacts

pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod remux;
pub mod transcribe;

pub use command::{check_ffmpeg, check_ffprobe, check_transcriber, FfmpegCommand, FfmpegRunner};
pub use download::{download, DownloadConfig, DEFAULT_MAX_SIZE_BYTES, MEDIA_MAX_SIZE_BYTES};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use remux::remux_with_captions;
pub use transcribe::{transcribe, TranscriptionResult};
