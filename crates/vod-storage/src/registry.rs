//! City registry: loaded once at startup, never mutated at runtime.
//!
//! A configuration-driven map from city id to mount descriptor, in place
//! of a hardcoded critical-mounts path list.

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;
use vod_models::{CityDescriptor, CityId};

use crate::error::{StorageError, StorageResult};

/// Immutable, shared-read map from city id to its descriptor.
pub type CityRegistry = Arc<HashMap<CityId, CityDescriptor>>;

/// Loads the registry from `CITIES_CONFIG`: tried first as a path to a JSON
/// file, then as an inline JSON document.
pub fn load_registry(cities_config: &str) -> StorageResult<CityRegistry> {
    let raw = if Path::new(cities_config).is_file() {
        std::fs::read_to_string(cities_config)?
    } else {
        cities_config.to_string()
    };

    let descriptors: Vec<CityDescriptor> = serde_json::from_str(&raw)
        .map_err(|e| StorageError::registry_config(format!("CITIES_CONFIG: {e}")))?;

    if descriptors.is_empty() {
        return Err(StorageError::registry_config("CITIES_CONFIG declares no cities"));
    }

    let mut map = HashMap::with_capacity(descriptors.len());
    for descriptor in descriptors {
        map.insert(descriptor.id.clone(), descriptor);
    }
    Ok(Arc::new(map))
}

/// Linux equivalent of Python's `os.path.ismount()`: a path is a mountpoint
/// if its device id differs from its parent's, or it has no parent (root).
pub fn is_mountpoint(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Some(parent) = path.parent() else {
        return true;
    };
    match std::fs::metadata(parent) {
        Ok(parent_meta) => meta.dev() != parent_meta.dev(),
        Err(_) => false,
    }
}

/// True if the mount both exists and accepts writes, checked via a throwaway
/// probe file. Used to gate `maintenance.backfill` to writable mounts.
pub fn is_writable(path: &Path) -> bool {
    let probe = path.join(".archivist_write_probe");
    match std::fs::File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(e) => {
            warn!(mount = %path.display(), error = %e, "mount not writable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_inline_json_registry() {
        let json = r#"[{"id":"flex3","name":"Flex Three","mount_path":"/mnt/flex-3","title_patterns":[]}]"#;
        let registry = load_registry(json).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains_key(&CityId::new("flex3")));
    }

    #[test]
    fn rejects_empty_registry() {
        assert!(load_registry("[]").is_err());
    }

    #[test]
    fn root_is_always_a_mountpoint() {
        assert!(is_mountpoint(Path::new("/")));
    }
}
