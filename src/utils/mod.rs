//! Utility functions module
//!
//! Process-level helpers that are not part of the timer engine itself.

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
