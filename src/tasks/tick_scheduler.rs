//! Tick scheduler background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::AppState;

/// One logical second
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that advances running timers once per second.
///
/// The interval only exists while at least one timer is running. It is armed
/// when the running signal turns true and dropped when it turns false.
pub async fn tick_scheduler_task(state: Arc<AppState>) {
    info!("Starting tick scheduler task");

    let mut running_rx = state.running_signal();

    loop {
        // Wait until some timer is running
        let armed = running_rx.wait_for(|running| *running).await.is_ok();
        if !armed {
            error!("Running signal closed, stopping tick scheduler");
            return;
        }

        info!("Timers running, arming tick scheduler");

        // First fire is a full period away, a timer started now waits for it.
        let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.tick_all() {
                        Ok(completed) => {
                            for event in &completed {
                                debug!("Tick completed timer {} '{}'", event.id, event.name);
                            }
                        }
                        Err(e) => error!("Failed to tick timers: {}", e),
                    }
                }

                changed = running_rx.changed() => {
                    if changed.is_err() {
                        error!("Running signal closed, stopping tick scheduler");
                        return;
                    }
                    let running = *running_rx.borrow_and_update();
                    if !running {
                        info!("No timers running, disarming tick scheduler");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        persistence::{MemoryStore, PersistenceGateway},
        state::Transition,
    };

    fn spawn_scheduler() -> Arc<AppState> {
        let gateway = PersistenceGateway::new(Arc::new(MemoryStore::new()));
        let state = Arc::new(AppState::init(gateway));
        tokio::spawn(tick_scheduler_task(Arc::clone(&state)));
        state
    }

    fn remaining(state: &AppState, id: u64) -> u64 {
        state.get(id).unwrap().unwrap().remaining_time
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_second_and_notifies() {
        let state = spawn_scheduler();
        let mut completions = state.subscribe_completions();
        let t = state.create("Study", 3, "School").unwrap();
        state.apply(t.id, Transition::Start).unwrap();

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(remaining(&state, t.id), 2);

        let event = timeout(Duration::from_secs(5), completions.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name, "Study");

        let done = state.get(t.id).unwrap().unwrap();
        assert!(done.completed && !done.running);
        assert!(!*state.running_signal().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timers_are_never_advanced() {
        let state = spawn_scheduler();
        let t = state.create("Idle", 5, "X").unwrap();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(remaining(&state, t.id), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_started_mid_interval_waits_for_next_fire() {
        let state = spawn_scheduler();
        let a = state.create("a", 100, "X").unwrap();
        let b = state.create("b", 1, "X").unwrap();
        state.apply(a.id, Transition::Start).unwrap();

        sleep(Duration::from_millis(1500)).await;
        state.apply(b.id, Transition::Start).unwrap();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(remaining(&state, b.id), 1);

        sleep(Duration::from_millis(500)).await;
        assert!(state.get(b.id).unwrap().unwrap().completed);
        assert_eq!(remaining(&state, a.id), 98);
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_disarms_and_restarting_rearms() {
        let state = spawn_scheduler();
        let t = state.create("Run", 10, "Workout").unwrap();
        state.apply(t.id, Transition::Start).unwrap();
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(remaining(&state, t.id), 8);

        state.apply(t.id, Transition::Pause).unwrap();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(remaining(&state, t.id), 8);

        state.apply(t.id, Transition::Start).unwrap();
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(remaining(&state, t.id), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_running_timer_stops_ticking() {
        let state = spawn_scheduler();
        let keep = state.create("keep", 10, "X").unwrap();
        let gone = state.create("gone", 10, "X").unwrap();
        state.bulk_update("X", Transition::Start).unwrap();

        sleep(Duration::from_millis(1500)).await;
        state.delete(gone.id).unwrap();
        sleep(Duration::from_secs(2)).await;

        assert!(state.get(gone.id).unwrap().is_none());
        assert_eq!(remaining(&state, keep.id), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn simultaneous_completions_each_notify_once() {
        let state = spawn_scheduler();
        let mut completions = state.subscribe_completions();
        for name in ["one", "two", "three"] {
            state.create(name, 2, "Break").unwrap();
        }
        state.bulk_update("Break", Transition::Start).unwrap();

        sleep(Duration::from_secs(5)).await;
        let mut names = Vec::new();
        while let Ok(event) = completions.try_recv() {
            names.push(event.name);
        }
        names.sort();
        assert_eq!(names, vec!["one", "three", "two"]);
    }
}
