//! Flex-mount storage access for the Archivist VOD captioning pipeline.
//!
//! This crate provides:
//! - The city registry, loaded once at startup from `CITIES_CONFIG`
//! - The discovery scanner, enumerating video candidates on a mount
//! - The caption predicate, deciding whether a video already has captions

pub mod captions;
pub mod discovery;
pub mod error;
pub mod registry;

pub use captions::has_caption;
pub use discovery::scan_mount;
pub use error::{StorageError, StorageResult};
pub use registry::{is_mountpoint, is_writable, load_registry, CityRegistry};
