//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::{CommandError, ValidationError},
    state::{Timer, TimerStatus},
};

/// Body of `POST /timers`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimerRequest {
    pub name: String,
    /// Seconds. Signed so that non-positive input can be rejected explicitly.
    pub duration: i64,
    #[serde(default)]
    pub category: String,
}

/// Body of `PATCH /timers/:id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditTimerRequest {
    pub name: Option<String>,
    pub category: Option<String>,
}

/// A timer as presented to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: Timer,
    pub status: TimerStatus,
    pub progress: f64,
    pub formatted_remaining: String,
}

impl From<Timer> for TimerView {
    fn from(timer: Timer) -> Self {
        Self {
            status: timer.status(),
            progress: timer.progress(),
            formatted_remaining: timer.formatted_remaining(),
            timer,
        }
    }
}

pub fn views(timers: Vec<Timer>) -> Vec<TimerView> {
    timers.into_iter().map(TimerView::from).collect()
}

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerView>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timer: Option<Timer>) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timer: timer.map(TimerView::from),
        }
    }

    pub fn ok(message: String) -> Self {
        Self::new("ok", message, None)
    }

    pub fn with_timer(message: String, timer: Timer) -> Self {
        Self::new("ok", message, Some(timer))
    }

    /// The command referred to an id that does not exist; nothing changed
    pub fn ignored(message: String) -> Self {
        Self::new("ignored", message, None)
    }
}

/// Bulk action result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub category: String,
    pub action: String,
    pub changed: usize,
    pub timestamp: DateTime<Utc>,
}

/// Status response with store counts and persistence health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total_timers: usize,
    pub running_timers: usize,
    pub completed_timers: usize,
    pub categories: usize,
    pub uptime: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
    pub last_persistence_error: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub error: String,
    pub message: String,
}

/// Failures mapped to HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound(u64),
    UnknownAction(String),
    Persistence(String),
    Internal(String),
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Validation(v) => ApiError::Validation(v),
            CommandError::Persistence(p) => ApiError::Persistence(p.to_string()),
            CommandError::Poisoned(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, error, message) = match self {
            ApiError::Validation(v) => (StatusCode::UNPROCESSABLE_ENTITY, format!("{:?}", v), v.to_string()),
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, "NotFound".to_string(), format!("timer {} not found", id)),
            ApiError::UnknownAction(action) => (
                StatusCode::BAD_REQUEST,
                "UnknownAction".to_string(),
                format!("unknown action '{}', expected start, pause or reset", action),
            ),
            ApiError::Persistence(msg) => (StatusCode::SERVICE_UNAVAILABLE, "Persistence".to_string(), msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal".to_string(), msg)
            }
        };

        let body = ErrorBody {
            status: "error".to_string(),
            error,
            message,
        };
        (code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_view_flattens_timer_fields() {
        let timer = Timer {
            id: 7,
            name: "Read".to_string(),
            duration: 120,
            category: "Study".to_string(),
            remaining_time: 30,
            running: true,
            completed: false,
        };
        let json = serde_json::to_value(TimerView::from(timer)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["remainingTime"], 30);
        assert_eq!(json["status"], "running");
        assert_eq!(json["progress"], 0.25);
        assert_eq!(json["formattedRemaining"], "00:30");
    }

    #[test]
    fn validation_errors_are_unprocessable() {
        let response = ApiError::Validation(ValidationError::EmptyName).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
