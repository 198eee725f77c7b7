use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;

use crate::content::library;
use crate::db::models::LibraryItem;
use crate::error::{AppError, AppResult};
use crate::extractors::Uploads;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/library", get(list).post(upload))
        .route("/api/library/{id}", delete(remove))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<LibraryItem>>> {
    Ok(Json(library::list(&state.store)?))
}

#[derive(Serialize)]
struct UploadResponse {
    items: Vec<LibraryItem>,
    /// Names of files that were neither images nor plain text
    skipped: Vec<String>,
}

async fn upload(
    State(state): State<AppState>,
    uploads: Uploads,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();

    for part in uploads.files() {
        let name = part.file_name.as_deref().unwrap_or_default();
        match library::classify(name, part.content_type.as_deref(), &part.data) {
            Some(item) => accepted.push(item),
            None => {
                tracing::debug!("Skipping unsupported library upload '{}'", name);
                skipped.push(name.to_string());
            }
        }
    }

    if accepted.is_empty() {
        return Err(AppError::BadRequest(
            "No image or text files in the upload".to_string(),
        ));
    }

    let added = accepted.len();
    let items = library::add_items(&state.store, state.config.library.max_items, accepted)?;
    tracing::info!("Added {} library items ({} skipped)", added, skipped.len());

    Ok((StatusCode::CREATED, Json(UploadResponse { items, skipped })))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    library::remove(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
