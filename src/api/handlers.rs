//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::{AppState, CategorySummary, Transition, AVAILABLE_CATEGORIES};
use super::responses::{
    views, ApiError, ApiResponse, BulkResponse, CreateTimerRequest, EditTimerRequest, HealthResponse,
    StatusResponse, TimerView,
};

fn parse_action(action: &str) -> Result<Transition, ApiError> {
    action
        .parse::<Transition>()
        .map_err(|_| ApiError::UnknownAction(action.to_string()))
}

/// Handle GET /timers - Snapshot of every timer in creation order
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TimerView>>, ApiError> {
    Ok(Json(views(state.snapshot()?)))
}

/// Handle POST /timers - Create a timer
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTimerRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let timer = state.create(&request.name, request.duration, &request.category)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_timer(format!("Timer '{}' created", timer.name), timer)),
    ))
}

/// Handle GET /timers/:id
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TimerView>, ApiError> {
    state
        .get(id)?
        .map(|timer| Json(TimerView::from(timer)))
        .ok_or(ApiError::NotFound(id))
}

/// Handle PATCH /timers/:id - Rename or re-categorize
pub async fn edit_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<EditTimerRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let edited = state.edit(id, request.name.as_deref(), request.category.as_deref())?;
    Ok(Json(match edited {
        Some(timer) => ApiResponse::with_timer(format!("Timer {} updated", id), timer),
        None => ApiResponse::ignored(format!("Timer {} not found", id)),
    }))
}

/// Handle DELETE /timers/:id - Missing ids are not an error
pub async fn delete_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle POST /timers/:id/:action - start, pause or reset one timer
pub async fn timer_action_handler(
    State(state): State<Arc<AppState>>,
    Path((id, action)): Path<(u64, String)>,
) -> Result<Json<ApiResponse>, ApiError> {
    let transition = parse_action(&action)?;
    Ok(Json(match state.apply(id, transition)? {
        Some(timer) => ApiResponse::with_timer(format!("Timer {} {}", id, transition), timer),
        None => ApiResponse::ignored(format!("Timer {} not found", id)),
    }))
}

/// Handle GET /categories - Per-category rollups in first-seen order
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    Ok(Json(state.category_summaries()?))
}

/// Handle GET /categories/available - Categories offered when creating a timer
pub async fn available_categories_handler() -> Json<Vec<&'static str>> {
    Json(AVAILABLE_CATEGORIES.to_vec())
}

/// Handle POST /categories/:category/:action - Bulk update a category
pub async fn bulk_action_handler(
    State(state): State<Arc<AppState>>,
    Path((category, action)): Path<(String, String)>,
) -> Result<Json<BulkResponse>, ApiError> {
    let transition = parse_action(&action)?;
    let changed = state.bulk_update(&category, transition)?;
    Ok(Json(BulkResponse {
        category,
        action: transition.to_string(),
        changed,
        timestamp: Utc::now(),
    }))
}

/// Handle POST /reload - Replace in-memory timers with the persisted ones
pub async fn reload_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let count = state.reload()?;
    Ok(Json(ApiResponse::ok(format!("Reloaded {} timer(s)", count))))
}

/// Handle GET /events - Server-sent completion events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Completion event subscriber connected");
    let completions = state.subscribe_completions();

    let events = stream::unfold(completions, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(completion) => match Event::default().event("completed").json_data(&completion) {
                    Ok(event) => return Some((Ok::<_, Infallible>(event), rx)),
                    Err(e) => warn!("Failed to encode completion event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Completion subscriber lagged, {} event(s) dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /status - Return current store status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let timers = state.snapshot()?;
    let categories = state.category_summaries()?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        total_timers: timers.len(),
        running_timers: timers.iter().filter(|t| t.running).count(),
        completed_timers: timers.iter().filter(|t| t.completed).count(),
        categories: categories.len(),
        uptime: state.get_uptime(),
        last_action,
        last_action_time,
        last_persistence_error: state.last_persistence_error(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
