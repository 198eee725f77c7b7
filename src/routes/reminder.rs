use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::content::reminder::{self, ReminderStatus};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reminder", get(check))
        .route("/api/reminder/published", post(published))
        .route("/api/reminder/dismiss", post(dismiss))
}

/// Polled by the page; a due reminder is shown once and restarts the timer.
async fn check(State(state): State<AppState>) -> AppResult<Json<ReminderStatus>> {
    let interval = state.config.reminder.interval().ok_or_else(|| {
        AppError::Internal(format!(
            "invalid reminder interval: {} hours",
            state.config.reminder.interval_hours
        ))
    })?;
    Ok(Json(reminder::check(&state.store, interval, Utc::now())?))
}

async fn published(State(state): State<AppState>) -> AppResult<StatusCode> {
    reminder::mark_published(&state.store, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dismiss(State(state): State<AppState>) -> AppResult<StatusCode> {
    reminder::dismiss(&state.store)?;
    Ok(StatusCode::NO_CONTENT)
}
