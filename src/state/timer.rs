//! Timer record and its state machine
//!
//! A timer is `Idle` (never started or paused), `Running` (advanced by the tick
//! scheduler) or `Completed` (terminal until reset). Every transition keeps
//! `0 <= remaining_time <= duration` and never leaves a timer both running and
//! completed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A single countdown timer, serialized with the field names used on the wire
/// and in the persisted blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: u64,
    pub name: String,
    /// Total seconds; the reset baseline.
    pub duration: u64,
    pub category: String,
    pub remaining_time: u64,
    pub running: bool,
    pub completed: bool,
}

/// Derived lifecycle label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Completed,
}

/// Commands a caller may apply to one timer or to a whole category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Start,
    Pause,
    Reset,
}

/// Result of one scheduler step on a single timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, nothing happened.
    Skipped,
    Advanced,
    /// Reached zero on this step.
    Completed,
}

impl Timer {
    /// Build a fresh idle timer. Validation happens in the store.
    pub(crate) fn new(id: u64, name: String, duration: u64, category: String) -> Self {
        Self {
            id,
            name,
            duration,
            category,
            remaining_time: duration,
            running: false,
            completed: false,
        }
    }

    pub fn status(&self) -> TimerStatus {
        if self.completed {
            TimerStatus::Completed
        } else if self.running {
            TimerStatus::Running
        } else {
            TimerStatus::Idle
        }
    }

    /// Fraction of the duration still remaining, 1.0 when fresh and 0.0 when done
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        self.remaining_time as f64 / self.duration as f64
    }

    /// Remaining time as `MM:SS`, minutes unbounded
    pub fn formatted_remaining(&self) -> String {
        format!("{:02}:{:02}", self.remaining_time / 60, self.remaining_time % 60)
    }

    /// Idle -> Running. Returns whether anything changed.
    pub fn start(&mut self) -> bool {
        if self.running || self.completed {
            return false;
        }
        self.running = true;
        true
    }

    /// Running -> Idle
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Any state -> Idle with a full countdown
    pub fn reset(&mut self) -> bool {
        let changed = self.running || self.completed || self.remaining_time != self.duration;
        self.running = false;
        self.completed = false;
        self.remaining_time = self.duration;
        changed
    }

    /// Any non-completed state -> Completed
    pub fn complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.remaining_time = 0;
        self.running = false;
        self.completed = true;
        true
    }

    pub fn apply(&mut self, transition: Transition) -> bool {
        match transition {
            Transition::Start => self.start(),
            Transition::Pause => self.pause(),
            Transition::Reset => self.reset(),
        }
    }

    /// Advance a running timer by one second, completing it at zero.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_time == 0 {
            return TickOutcome::Skipped;
        }
        self.remaining_time -= 1;
        if self.remaining_time == 0 {
            self.complete();
            TickOutcome::Completed
        } else {
            TickOutcome::Advanced
        }
    }

    /// Check the record-level invariants, used when accepting persisted data.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.duration == 0 {
            return Err(format!("timer {} has a zero duration", self.id));
        }
        if self.remaining_time > self.duration {
            return Err(format!(
                "timer {} has {}s remaining of a {}s duration",
                self.id, self.remaining_time, self.duration
            ));
        }
        if self.completed && (self.running || self.remaining_time != 0) {
            return Err(format!("timer {} is completed but still counting", self.id));
        }
        if !self.completed && self.remaining_time == 0 {
            return Err(format!("timer {} has nothing left but is not completed", self.id));
        }
        if self.id == u64::MAX {
            return Err(format!("timer id {} leaves no room for new ids", self.id));
        }
        Ok(())
    }
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Pause => "pause",
            Transition::Reset => "reset",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Transition::Start),
            "pause" => Ok(Transition::Pause),
            "reset" => Ok(Transition::Reset),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}
