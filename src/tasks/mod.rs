//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod persistence_writer;
pub mod tick_scheduler;

// Re-export main functions
pub use persistence_writer::persistence_writer_task;
pub use tick_scheduler::{tick_scheduler_task, TICK_INTERVAL};
