//! JSON file key-value medium

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::debug;

use crate::error::StorageError;

use super::KeyValueStore;

/// Keeps every key in one JSON object on disk. A missing file is an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} key(s) to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Failed to lock storage file: {}", e)))?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("none.json"));
        assert_eq!(store.get("timers").unwrap(), None);
        assert_eq!(store.path(), dir.path().join("none.json"));
    }

    #[test]
    fn set_then_get_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        JsonFileStore::new(&path).set("timers", "[]").unwrap();
        JsonFileStore::new(&path).set("other", "x").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("timers").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn garbage_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).get("timers"),
            Err(StorageError::Format(_))
        ));
    }
}
