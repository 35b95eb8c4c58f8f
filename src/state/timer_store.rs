//! In-memory timer collection

use chrono::Utc;
use tracing::debug;

use crate::error::ValidationError;

use super::timer::{TickOutcome, Timer, Transition};

/// Owns every timer, in creation order.
///
/// All operations are synchronous; callers that share the store wrap it in a
/// lock so a bulk update or tick is never observed half-applied.
#[derive(Debug, Default, Clone)]
pub struct TimerStore {
    timers: Vec<Timer>,
    /// Highest id ever handed out, including deleted timers.
    last_id: u64,
}

impl TimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted timers, keeping their order
    pub fn from_timers(timers: Vec<Timer>) -> Self {
        let last_id = timers.iter().map(|t| t.id).max().unwrap_or(0);
        Self { timers, last_id }
    }

    /// Swap in another collection without lowering the id high-water mark
    pub fn replace_timers(&mut self, timers: Vec<Timer>) {
        let loaded = Self::from_timers(timers);
        self.last_id = self.last_id.max(loaded.last_id);
        self.timers = loaded.timers;
    }

    /// Create an idle timer. The name is trimmed; duration is in seconds.
    pub fn create(&mut self, name: &str, duration: i64, category: &str) -> Result<Timer, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if duration <= 0 {
            return Err(ValidationError::NonPositiveDuration);
        }

        let id = self.next_id().ok_or(ValidationError::IdsExhausted)?;
        let timer = Timer::new(id, name.to_string(), duration as u64, category.to_string());
        self.timers.push(timer.clone());
        debug!("Created timer {} ({}s, category {:?})", id, duration, category);
        Ok(timer)
    }

    /// Remove a timer. Returns false when the id was not present.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Apply a transition to one timer. Returns whether the timer changed.
    pub fn update(&mut self, id: u64, transition: Transition) -> bool {
        self.timers
            .iter_mut()
            .find(|t| t.id == id)
            .map(|t| t.apply(transition))
            .unwrap_or(false)
    }

    /// Rename or re-categorize one timer. Counting state is left alone.
    pub fn edit(&mut self, id: u64, name: Option<&str>, category: Option<&str>) -> Result<bool, ValidationError> {
        let name = match name.map(str::trim) {
            Some("") => return Err(ValidationError::EmptyName),
            other => other,
        };

        let Some(timer) = self.timers.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        let mut changed = false;
        if let Some(name) = name {
            if timer.name != name {
                timer.name = name.to_string();
                changed = true;
            }
        }
        if let Some(category) = category {
            if timer.category != category {
                timer.category = category.to_string();
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Apply a transition to every timer in a category. Returns how many changed.
    pub fn bulk_update(&mut self, category: &str, action: Transition) -> usize {
        self.timers
            .iter_mut()
            .filter(|t| t.category == category)
            .map(|t| t.apply(action))
            .filter(|changed| *changed)
            .count()
    }

    /// Advance every running timer by one second.
    ///
    /// Returns the timers that reached zero during this call, each exactly once.
    pub fn tick_all(&mut self) -> Vec<Timer> {
        let mut completed = Vec::new();
        for timer in self.timers.iter_mut() {
            if timer.tick() == TickOutcome::Completed {
                completed.push(timer.clone());
            }
        }
        completed
    }

    pub fn snapshot(&self) -> Vec<Timer> {
        self.timers.clone()
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn get(&self, id: u64) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    pub fn any_running(&self) -> bool {
        self.timers.iter().any(|t| t.running)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Creation time in milliseconds, bumped past the last id if the clock stalls
    fn next_id(&mut self) -> Option<u64> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(self.last_id.checked_add(1)?);
        self.last_id = id;
        Some(id)
    }
}
