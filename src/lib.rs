//! Timer Keeper - a local daemon for named, categorized countdown timers
//!
//! This library keeps many independent countdown timers advancing in
//! lockstep, applies start/pause/reset commands individually or per category,
//! reports each completion exactly once and persists the whole collection to a
//! key-value medium after every change.

pub mod api;
pub mod config;
pub mod error;
pub mod persistence;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{CommandError, PersistenceError, ValidationError};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, PersistenceGateway};
pub use state::{AppState, Timer, TimerStore, Transition};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
