pub mod assets;
pub mod calendar;
pub mod home;
pub mod library;
pub mod posts;
pub mod query;
pub mod reminder;
pub mod schedule;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    // Multipart bodies carry several files, each capped by the extractor.
    let body_limit = state.config.library.max_upload_bytes.saturating_mul(4);

    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health))
        .route("/assets/{*path}", get(assets::serve))
        .merge(posts::router())
        .merge(sessions::router())
        .merge(library::router())
        .merge(calendar::router())
        .merge(schedule::router())
        .merge(query::router())
        .merge(reminder::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
