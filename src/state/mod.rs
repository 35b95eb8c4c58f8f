//! State management module
//!
//! This module contains the timer records, the store that owns them, category
//! rollups and the shared application state the daemon runs on.

pub mod app_state;
pub mod categories;
pub mod events;
pub mod timer;
pub mod timer_store;

// Re-export main types
pub use app_state::AppState;
pub use categories::{CategorySummary, AVAILABLE_CATEGORIES};
pub use events::CompletionEvent;
pub use timer::{TickOutcome, Timer, TimerStatus, Transition};
pub use timer_store::TimerStore;
