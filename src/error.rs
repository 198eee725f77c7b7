use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ai::BackendError;
use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("AI backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("The AI returned content in an unexpected format: {0}")]
    MalformedOutput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Whether repeating the same user action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Backend(e) => e.is_retryable(),
            AppError::MalformedOutput(_) => true,
            _ => false,
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Backend(BackendError::NotConfigured) => {
                tracing::warn!("AI backend is not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI backend is not configured. Set an API key.".to_string(),
                )
            }
            AppError::Backend(BackendError::Quota) => {
                tracing::warn!("AI backend quota exhausted");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "AI quota exhausted, try again shortly".to_string(),
                )
            }
            AppError::Backend(e) => {
                tracing::warn!("AI backend error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "AI backend unavailable, please retry".to_string(),
                )
            }
            AppError::MalformedOutput(detail) => {
                tracing::warn!("Malformed AI output: {}", detail);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "The AI returned content in an unexpected format".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                internal()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                internal()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                internal()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = serde_json::json!({
            "error": message,
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
