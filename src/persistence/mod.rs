//! Persistence module
//!
//! The timer collection is stored as one JSON array under a single key of a
//! key-value medium. The medium is abstracted behind [`KeyValueStore`].

pub mod file_store;
pub mod gateway;
pub mod memory_store;

use crate::error::StorageError;

// Re-export main types
pub use file_store::JsonFileStore;
pub use gateway::{PersistenceGateway, TIMERS_KEY};
pub use memory_store::MemoryStore;

/// A string key-value medium
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
