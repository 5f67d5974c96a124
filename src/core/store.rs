use anyhow::{Context, Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::common::TRACKING_STATE_KEY;

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Flat string map persisted as a TOML file.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            match Self::load(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(target: "geotrack::store", "Discarding unreadable state: {:#}", e);
                    BTreeMap::new()
                }
            }
        } else {
            debug!(target: "geotrack::store", "State file {} not found, starting empty", path.display());
            BTreeMap::new()
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let toml_string = toml::to_string(entries).context("Failed to serialize state")?;

        let temp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string).context("Failed to write temporary file")?;
        std::fs::rename(&temp_path, &self.path).context("Failed to rename to final file")?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("State lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("State lock poisoned"))?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.save(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Volatile store, for setups that should never resume tracking.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("State lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("State lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads the persisted tracking flag. Missing or unrecognised values mean "off".
pub fn load_tracking_flag(store: &dyn KeyValueStore) -> Result<bool> {
    match store.get(TRACKING_STATE_KEY)?.as_deref() {
        Some("true") => Ok(true),
        Some("false") | None => Ok(false),
        Some(other) => {
            warn!(target: "geotrack::store", "Ignoring unexpected {} value {:?}", TRACKING_STATE_KEY, other);
            Ok(false)
        }
    }
}

pub fn save_tracking_flag(store: &dyn KeyValueStore, tracking: bool) -> Result<()> {
    store.set(TRACKING_STATE_KEY, if tracking { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let store = FileStore::open(&path);
        assert_eq!(store.get(TRACKING_STATE_KEY).unwrap(), None);
        save_tracking_flag(&store, true).unwrap();
        drop(store);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("trackingState = \"true\""));
        assert!(!path.with_extension("toml.tmp").exists());

        let reopened = FileStore::open(&path);
        assert!(load_tracking_flag(&reopened).unwrap());
        save_tracking_flag(&reopened, false).unwrap();
        assert_eq!(
            reopened.get(TRACKING_STATE_KEY).unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        for content in ["trackingState = [", "trackingState = true"] {
            std::fs::write(&path, content).unwrap();
            let store = FileStore::open(&path);
            assert!(!load_tracking_flag(&store).unwrap());

            save_tracking_flag(&store, true).unwrap();
            let reopened = FileStore::open(&path);
            assert!(load_tracking_flag(&reopened).unwrap());
        }
    }

    #[test]
    fn test_unexpected_flag_value_is_off() {
        let store = MemoryStore::new();
        assert!(!load_tracking_flag(&store).unwrap());
        store.set(TRACKING_STATE_KEY, "yes").unwrap();
        assert!(!load_tracking_flag(&store).unwrap());
        store.set(TRACKING_STATE_KEY, "true").unwrap();
        assert!(load_tracking_flag(&store).unwrap());
    }
}
