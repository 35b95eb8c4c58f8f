//! Main application state management

use std::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    error::{CommandError, PersistenceError, ValidationError},
    persistence::PersistenceGateway,
};
use super::{categories, CategorySummary, CompletionEvent, Timer, TimerStore, Transition};

/// Shared state behind every command: the timer store, its persistence feed
/// and the channels background tasks listen on.
pub struct AppState {
    /// The single owner of all timers
    store: Mutex<TimerStore>,
    gateway: PersistenceGateway,
    /// Server metadata
    pub start_time: Instant,
    /// Last action tracking
    last_action: Mutex<Option<String>>,
    last_action_time: Mutex<Option<DateTime<Utc>>>,
    last_persistence_error: Mutex<Option<String>>,
    /// Completion notifications for UI subscribers
    completion_tx: broadcast::Sender<CompletionEvent>,
    /// Latest full snapshot, consumed by the persistence writer
    persist_tx: watch::Sender<Vec<Timer>>,
    /// Whether any timer is running, arms the tick scheduler
    running_tx: watch::Sender<bool>,
    /// Set once on shutdown, tells the persistence writer to drain and exit
    writer_stop_tx: watch::Sender<bool>,
}

impl AppState {
    /// Load persisted timers and build the state around them.
    ///
    /// Never fails: unreadable or corrupt data yields an empty store and is
    /// reported through [`AppState::last_persistence_error`].
    pub fn init(gateway: PersistenceGateway) -> Self {
        let (store, load_error) = match gateway.load() {
            Ok(timers) => {
                info!("Loaded {} persisted timer(s)", timers.len());
                (TimerStore::from_timers(timers), None)
            }
            Err(e) => {
                warn!("Starting with an empty timer store: {}", e);
                if e.is_corrupt() {
                    if let Err(backup_err) = gateway.preserve_corrupt() {
                        warn!("Failed to keep a copy of the corrupt blob: {}", backup_err);
                    }
                }
                (TimerStore::new(), Some(e.to_string()))
            }
        };

        let state = Self::with_store(gateway, store);
        if let Ok(mut last) = state.last_persistence_error.lock() {
            *last = load_error;
        }
        state
    }

    /// Build the state around an existing store without touching persistence
    pub fn with_store(gateway: PersistenceGateway, store: TimerStore) -> Self {
        let (completion_tx, _) = broadcast::channel(100);
        let (persist_tx, _) = watch::channel(store.snapshot());
        let (running_tx, _) = watch::channel(store.any_running());
        let (writer_stop_tx, _) = watch::channel(false);

        Self {
            store: Mutex::new(store),
            gateway,
            start_time: Instant::now(),
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            last_persistence_error: Mutex::new(None),
            completion_tx,
            persist_tx,
            running_tx,
            writer_stop_tx,
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, TimerStore>, CommandError> {
        self.store
            .lock()
            .map_err(|e| CommandError::Poisoned(format!("Failed to lock timer store: {}", e)))
    }

    /// Apply a mutation, then hand the resulting state to the persistence
    /// writer and the scheduler before the lock is released.
    fn mutate<T, F>(&self, action: &str, updater: F) -> Result<T, CommandError>
    where
        F: FnOnce(&mut TimerStore) -> Result<T, ValidationError>,
    {
        let mut store = self.lock_store()?;
        let outcome = updater(&mut store)?;
        self.publish(&store);
        drop(store);

        self.record_action(action);
        Ok(outcome)
    }

    /// Must be called with the store locked so snapshots are published in
    /// mutation order.
    fn publish(&self, store: &TimerStore) {
        self.persist_tx.send_replace(store.snapshot());
        self.signal_running(store.any_running());
    }

    fn signal_running(&self, running: bool) {
        self.running_tx.send_if_modified(|current| {
            let changed = *current != running;
            *current = running;
            changed
        });
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Create an idle timer
    pub fn create(&self, name: &str, duration: i64, category: &str) -> Result<Timer, CommandError> {
        let timer = self.mutate("create", |store| store.create(name, duration, category))?;
        info!("Created timer '{}' ({}s) in category '{}'", timer.name, timer.duration, timer.category);
        Ok(timer)
    }

    /// Delete a timer. Missing ids are not an error.
    pub fn delete(&self, id: u64) -> Result<bool, CommandError> {
        let removed = self.mutate("delete", |store| Ok(store.delete(id)))?;
        if removed {
            info!("Deleted timer {}", id);
        } else {
            debug!("Delete ignored, timer {} not found", id);
        }
        Ok(removed)
    }

    /// Start, pause or reset one timer. Returns the timer afterwards, if it exists.
    pub fn apply(&self, id: u64, transition: Transition) -> Result<Option<Timer>, CommandError> {
        let timer = self.mutate(transition.as_str(), |store| {
            store.update(id, transition);
            Ok(store.get(id).cloned())
        })?;
        match &timer {
            Some(t) => info!("Timer {} '{}' {} -> {:?}", id, t.name, transition, t.status()),
            None => debug!("{} ignored, timer {} not found", transition, id),
        }
        Ok(timer)
    }

    /// Rename or re-categorize one timer
    pub fn edit(&self, id: u64, name: Option<&str>, category: Option<&str>) -> Result<Option<Timer>, CommandError> {
        self.mutate("edit", |store| {
            store.edit(id, name, category)?;
            Ok(store.get(id).cloned())
        })
    }

    /// Apply a transition to every timer of a category as one batch
    pub fn bulk_update(&self, category: &str, action: Transition) -> Result<usize, CommandError> {
        let changed = self.mutate(&format!("bulk-{}", action), |store| Ok(store.bulk_update(category, action)))?;
        info!("Bulk {} on category '{}' changed {} timer(s)", action, category, changed);
        Ok(changed)
    }

    /// Advance every running timer by one second and raise completion events.
    ///
    /// Nothing is persisted when no timer was running.
    pub fn tick_all(&self) -> Result<Vec<CompletionEvent>, CommandError> {
        let mut store = self.lock_store()?;
        if !store.any_running() {
            return Ok(Vec::new());
        }
        let completed = store.tick_all();
        self.publish(&store);
        drop(store);

        let events: Vec<CompletionEvent> = completed.iter().map(CompletionEvent::for_timer).collect();
        for event in &events {
            info!("Timer {} '{}' completed", event.id, event.name);
            // No subscribers is fine, the UI may not be listening.
            let _ = self.completion_tx.send(event.clone());
        }
        Ok(events)
    }

    /// Replace in-memory timers with the persisted ones.
    ///
    /// A load failure leaves the current timers untouched and is reported the
    /// same way as at startup.
    pub fn reload(&self) -> Result<usize, CommandError> {
        let timers = match self.gateway.load() {
            Ok(timers) => timers,
            Err(e) => {
                warn!("Reload failed, keeping current timers: {}", e);
                if e.is_corrupt() {
                    if let Err(backup_err) = self.gateway.preserve_corrupt() {
                        warn!("Failed to keep a copy of the corrupt blob: {}", backup_err);
                    }
                }
                if let Ok(mut last) = self.last_persistence_error.lock() {
                    *last = Some(e.to_string());
                }
                return Err(e.into());
            }
        };
        let count = timers.len();

        let mut store = self.lock_store()?;
        store.replace_timers(timers);
        // Supersedes any snapshot still waiting for the writer.
        self.publish(&store);
        drop(store);

        self.record_action("reload");
        info!("Reloaded {} timer(s) from persistence", count);
        Ok(count)
    }

    /// Save the current state synchronously.
    ///
    /// Must not race the persistence writer task; on shutdown the writer calls
    /// this itself after [`AppState::stop_writer`].
    pub fn flush(&self) -> Result<(), CommandError> {
        let snapshot = self.snapshot()?;
        let result = self.gateway.save(&snapshot);
        self.record_persistence_result(&result);
        result.map_err(CommandError::from)
    }

    /// Consistent copy of every timer, in creation order
    pub fn snapshot(&self) -> Result<Vec<Timer>, CommandError> {
        Ok(self.lock_store()?.snapshot())
    }

    pub fn get(&self, id: u64) -> Result<Option<Timer>, CommandError> {
        Ok(self.lock_store()?.get(id).cloned())
    }

    pub fn category_summaries(&self) -> Result<Vec<CategorySummary>, CommandError> {
        Ok(categories::summaries(self.lock_store()?.timers()))
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<CompletionEvent> {
        self.completion_tx.subscribe()
    }

    /// Receiver that reports whether any timer is running
    pub fn running_signal(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    /// Receiver of full snapshots, one per mutation (coalesced)
    pub fn persistence_feed(&self) -> watch::Receiver<Vec<Timer>> {
        self.persist_tx.subscribe()
    }

    /// Ask the persistence writer to save the newest state and exit
    pub fn stop_writer(&self) {
        self.writer_stop_tx.send_replace(true);
    }

    pub fn writer_stop_signal(&self) -> watch::Receiver<bool> {
        self.writer_stop_tx.subscribe()
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Remember the outcome of a save for the status view
    pub fn record_persistence_result(&self, result: &Result<(), PersistenceError>) {
        if let Ok(mut last) = self.last_persistence_error.lock() {
            match result {
                Ok(()) => *last = None,
                Err(e) => *last = Some(e.to_string()),
            }
        }
    }

    pub fn last_persistence_error(&self) -> Option<String> {
        self.last_persistence_error.lock().ok().and_then(|e| e.clone())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::persistence::{gateway::CORRUPT_BACKUP_KEY, KeyValueStore, MemoryStore, TIMERS_KEY};

    fn fresh() -> (AppState, Arc<MemoryStore>) {
        let medium = Arc::new(MemoryStore::new());
        let state = AppState::init(PersistenceGateway::new(medium.clone()));
        (state, medium)
    }

    #[test]
    fn corrupt_blob_starts_empty_and_is_kept() {
        let medium = Arc::new(MemoryStore::with_entry(TIMERS_KEY, "[{oops"));
        let state = AppState::init(PersistenceGateway::new(medium.clone()));

        assert!(state.snapshot().unwrap().is_empty());
        assert!(state.last_persistence_error().is_some());
        assert_eq!(medium.get(CORRUPT_BACKUP_KEY).unwrap().as_deref(), Some("[{oops"));
    }

    #[test]
    fn init_restores_saved_timers() {
        let (state, medium) = fresh();
        let t = state.create("Read", 60, "Study").unwrap();
        state.apply(t.id, Transition::Start).unwrap();
        state.flush().unwrap();

        let restored = AppState::init(PersistenceGateway::new(medium));
        assert_eq!(restored.snapshot().unwrap(), state.snapshot().unwrap());
        assert!(*restored.running_signal().borrow());
    }

    #[test]
    fn mutations_feed_the_persistence_writer() {
        let (state, _) = fresh();
        let mut feed = state.persistence_feed();
        assert!(!feed.has_changed().unwrap());

        let t = state.create("Read", 60, "Study").unwrap();
        assert!(feed.has_changed().unwrap());
        assert_eq!(*feed.borrow_and_update(), vec![t]);
    }

    #[test]
    fn rejected_create_publishes_nothing() {
        let (state, _) = fresh();
        let feed = state.persistence_feed();
        let err = state.create("", 10, "X").unwrap_err();
        assert!(matches!(err, CommandError::Validation(ValidationError::EmptyName)));
        assert!(!feed.has_changed().unwrap());
        assert!(state.snapshot().unwrap().is_empty());
    }

    #[test]
    fn running_signal_follows_start_and_pause() {
        let (state, _) = fresh();
        let signal = state.running_signal();
        let t = state.create("Run", 10, "Workout").unwrap();
        assert!(!*signal.borrow());

        state.apply(t.id, Transition::Start).unwrap();
        assert!(*signal.borrow());

        state.apply(t.id, Transition::Pause).unwrap();
        assert!(!*signal.borrow());
    }

    #[test]
    fn tick_all_broadcasts_each_completion_once() {
        let (state, _) = fresh();
        let mut rx = state.subscribe_completions();
        let t = state.create("Tea", 2, "Break").unwrap();
        state.apply(t.id, Transition::Start).unwrap();

        assert!(state.tick_all().unwrap().is_empty());
        let events = state.tick_all().unwrap();
        assert_eq!(events.len(), 1);
        assert!(state.tick_all().unwrap().is_empty());

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "Tea");
        assert!(rx.try_recv().is_err());
        assert!(!*state.running_signal().borrow());
    }

    #[test]
    fn tick_without_running_timers_does_not_persist() {
        let (state, _) = fresh();
        state.create("Idle", 5, "X").unwrap();
        let feed = state.persistence_feed();
        state.tick_all().unwrap();
        assert!(!feed.has_changed().unwrap());
    }

    #[test]
    fn write_failure_keeps_memory_state_and_is_reported() {
        let (state, medium) = fresh();
        state.create("Read", 60, "Study").unwrap();
        medium.set_fail_writes(true);

        assert!(state.flush().is_err());
        assert_eq!(state.snapshot().unwrap().len(), 1);
        assert!(state.last_persistence_error().is_some());

        medium.set_fail_writes(false);
        state.flush().unwrap();
        assert!(state.last_persistence_error().is_none());
    }

    #[test]
    fn reload_replaces_memory_with_persisted_state() {
        let (state, _) = fresh();
        state.create("Saved", 60, "Study").unwrap();
        state.flush().unwrap();
        state.create("Unsaved", 60, "Study").unwrap();

        assert_eq!(state.reload().unwrap(), 1);
        let names: Vec<_> = state.snapshot().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Saved"]);
    }

    #[test]
    fn reload_of_corrupt_blob_keeps_memory_state() {
        let (state, medium) = fresh();
        state.create("Keep", 60, "Study").unwrap();
        medium.set(TIMERS_KEY, "nonsense").unwrap();

        assert!(matches!(state.reload(), Err(CommandError::Persistence(_))));
        assert_eq!(state.snapshot().unwrap().len(), 1);
        assert!(state.last_persistence_error().is_some());
        assert_eq!(medium.get(CORRUPT_BACKUP_KEY).unwrap().as_deref(), Some("nonsense"));
    }

    #[test]
    fn failed_id_allocation_leaves_store_usable() {
        let medium = Arc::new(MemoryStore::new());
        let store = TimerStore::from_timers(vec![Timer::new(u64::MAX, "last".into(), 5, "X".into())]);
        let state = AppState::with_store(PersistenceGateway::new(medium), store);

        let err = state.create("b", 5, "X").unwrap_err();
        assert!(matches!(err, CommandError::Validation(ValidationError::IdsExhausted)));
        assert_eq!(state.snapshot().unwrap().len(), 1);
        assert!(state.delete(u64::MAX).unwrap());
    }

    #[test]
    fn stop_writer_is_observed_by_late_subscribers() {
        let (state, _) = fresh();
        state.stop_writer();
        assert!(*state.writer_stop_signal().borrow());
    }

    #[test]
    fn last_action_is_tracked() {
        let (state, _) = fresh();
        state.create("a", 5, "School").unwrap();
        state.bulk_update("School", Transition::Start).unwrap();
        let (action, at) = state.get_last_action();
        assert_eq!(action.as_deref(), Some("bulk-start"));
        assert!(at.is_some());
    }
}
