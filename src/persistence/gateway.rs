//! Loading and saving the timer collection

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::{error::PersistenceError, state::Timer};

use super::KeyValueStore;

/// Key holding the serialized timer array
pub const TIMERS_KEY: &str = "timers";

/// Key a corrupt blob is copied to before it can be overwritten
pub const CORRUPT_BACKUP_KEY: &str = "timers.corrupt";

/// Serializes the whole ordered collection to one JSON blob
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write the full collection under [`TIMERS_KEY`]
    pub fn save(&self, timers: &[Timer]) -> Result<(), PersistenceError> {
        let blob = serde_json::to_string(timers).map_err(PersistenceError::Encode)?;
        self.store.set(TIMERS_KEY, &blob).map_err(PersistenceError::Write)?;
        debug!("Saved {} timer(s)", timers.len());
        Ok(())
    }

    /// Read the collection back. An absent key is an empty collection.
    pub fn load(&self) -> Result<Vec<Timer>, PersistenceError> {
        let Some(blob) = self.store.get(TIMERS_KEY).map_err(PersistenceError::Read)? else {
            debug!("No persisted timers found");
            return Ok(Vec::new());
        };

        let timers: Vec<Timer> =
            serde_json::from_str(&blob).map_err(|e| PersistenceError::CorruptState(e.to_string()))?;

        let mut ids = HashSet::with_capacity(timers.len());
        for timer in &timers {
            if !ids.insert(timer.id) {
                return Err(PersistenceError::CorruptState(format!("duplicate timer id {}", timer.id)));
            }
            timer.check_invariants().map_err(PersistenceError::CorruptState)?;
        }

        debug!("Loaded {} timer(s)", timers.len());
        Ok(timers)
    }

    /// Copy the raw blob to [`CORRUPT_BACKUP_KEY`] so later saves do not destroy it
    pub fn preserve_corrupt(&self) -> Result<(), PersistenceError> {
        if let Some(blob) = self.store.get(TIMERS_KEY).map_err(PersistenceError::Read)? {
            self.store
                .set(CORRUPT_BACKUP_KEY, &blob)
                .map_err(PersistenceError::Write)?;
            warn!("Corrupt timer blob copied to key '{}'", CORRUPT_BACKUP_KEY);
        }
        Ok(())
    }
}
