//! Notifications raised to observers of the timer collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer::Timer;

/// Raised once each time a timer counts down to zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: u64,
    pub name: String,
    pub at: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn for_timer(timer: &Timer) -> Self {
        Self {
            id: timer.id,
            name: timer.name.clone(),
            at: Utc::now(),
        }
    }
}
