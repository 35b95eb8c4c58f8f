//! Persistence writer background task

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::state::{AppState, Timer};

/// Background task that saves each published snapshot, one write at a time.
///
/// Snapshots published while a write is in flight are coalesced into the
/// newest one, so an older state is never written after a newer one. After
/// [`AppState::stop_writer`] the task saves the current state once more and
/// returns, so no other writer is needed on shutdown.
pub async fn persistence_writer_task(state: Arc<AppState>) {
    info!("Starting persistence writer task");

    let mut feed = state.persistence_feed();
    let mut stop = state.writer_stop_signal();

    loop {
        tokio::select! {
            changed = feed.changed() => {
                if changed.is_err() {
                    info!("Persistence feed closed, writer stopping");
                    return;
                }
                let timers = feed.borrow_and_update().clone();
                save_snapshot(&state, timers).await;
            }
            _ = async { stop.wait_for(|stopping| *stopping).await.map(|_| ()) } => {
                break;
            }
        }
    }

    match tokio::task::spawn_blocking(move || state.flush()).await {
        Ok(Ok(())) => info!("Final timer state persisted, writer stopping"),
        Ok(Err(e)) => error!("Failed to persist timers on shutdown: {}", e),
        Err(e) => error!("Final persistence write failed: {}", e),
    }
}

async fn save_snapshot(state: &AppState, timers: Vec<Timer>) {
    let gateway = state.gateway().clone();

    match tokio::task::spawn_blocking(move || gateway.save(&timers)).await {
        Ok(result) => {
            if let Err(e) = &result {
                error!("Failed to persist timers, will retry on next change: {}", e);
            } else {
                debug!("Persisted timer snapshot");
            }
            state.record_persistence_result(&result);
        }
        Err(e) => error!("Persistence write task failed: {}", e),
    }
}
