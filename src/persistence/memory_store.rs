//! In-process key-value medium

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use crate::error::StorageError;

use super::KeyValueStore;

/// Map-backed medium. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with one key already populated
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }

    /// Make every subsequent `set` fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes are disabled".to_string()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("timers").unwrap(), None);
    }

    #[test]
    fn failed_writes_leave_previous_value() {
        let store = MemoryStore::with_entry("timers", "[]");
        store.set_fail_writes(true);
        assert!(store.set("timers", "[1]").is_err());
        assert_eq!(store.get("timers").unwrap().as_deref(), Some("[]"));

        store.set_fail_writes(false);
        store.set("timers", "[1]").unwrap();
        assert_eq!(store.get("timers").unwrap().as_deref(), Some("[1]"));
    }
}
