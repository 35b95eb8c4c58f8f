use std::{fs, sync::Arc};

use timer_keeper::{
    persistence::TIMERS_KEY, AppState, JsonFileStore, KeyValueStore, PersistenceGateway, Transition,
};

fn state_at(path: &std::path::Path) -> AppState {
    AppState::init(PersistenceGateway::new(Arc::new(JsonFileStore::new(path))))
}

#[test]
fn timers_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timers.json");

    let before = {
        let state = state_at(&path);
        let run = state.create("Run", 5, "Workout").unwrap();
        let tea = state.create("Tea", 2, "Break").unwrap();
        state.create("Read", 600, "Study").unwrap();
        state.apply(run.id, Transition::Start).unwrap();
        state.apply(tea.id, Transition::Start).unwrap();
        state.tick_all().unwrap();
        state.tick_all().unwrap();
        state.flush().unwrap();
        state.snapshot().unwrap()
    };

    let after = state_at(&path).snapshot().unwrap();
    assert_eq!(after, before);
    assert!(after[1].completed);
    assert_eq!(after[0].remaining_time, 3);
    assert!(after[0].running);
}

#[test]
fn corrupt_file_blob_starts_empty_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timers.json");
    JsonFileStore::new(&path).set(TIMERS_KEY, "[{\"id\": oops").unwrap();

    let state = state_at(&path);
    assert!(state.snapshot().unwrap().is_empty());
    assert!(state.last_persistence_error().is_some());

    // New timers can still be created and saved.
    state.create("Fresh", 10, "Office").unwrap();
    state.flush().unwrap();
    assert_eq!(state_at(&path).snapshot().unwrap().len(), 1);
}

#[test]
fn unreadable_medium_falls_back_to_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timers.json");
    fs::write(&path, "definitely not a key-value document").unwrap();

    let state = state_at(&path);
    assert!(state.snapshot().unwrap().is_empty());
    assert!(state.last_persistence_error().is_some());
    // The broken file is left in place for inspection.
    state.create("Kept in memory", 10, "Office").unwrap();
    assert!(state.flush().is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "definitely not a key-value document");
}
