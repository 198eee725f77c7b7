use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::content::drafts::{self, DraftUpdate};
use crate::content::export::{format_for_clipboard, image_filename};
use crate::content::generator::{generate_drafts, generate_post, GenerateOptions};
use crate::content::{library, reminder};
use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::extractors::Uploads;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts/generate", post(generate))
        .route("/api/posts/proactive", post(proactive))
        .route("/api/drafts", get(list_drafts))
        .route(
            "/api/drafts/{id}",
            get(get_draft).put(update_draft).delete(delete_draft),
        )
        .route("/api/drafts/{id}/text", get(draft_text))
        .route("/api/drafts/{id}/image", get(draft_image))
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route(
            "/api/favorites/{id}",
            get(favorite_status).delete(remove_favorite),
        )
        .route("/api/composite", post(composite))
}

// --- Generation ---

async fn generate(
    State(state): State<AppState>,
    Json(options): Json<GenerateOptions>,
) -> AppResult<Json<Post>> {
    let item = match options.library_item_id.as_deref() {
        Some(id) => Some(library::get(&state.store, id)?),
        None => None,
    };

    let post = generate_post(state.backend(), state.language(), &options, item.as_ref()).await?;
    drafts::save(&state.store, &post)?;
    reminder::mark_published(&state.store, chrono::Utc::now())?;

    Ok(Json(post))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProactiveRequest {
    post_type: String,
    #[serde(default = "default_draft_count")]
    count: usize,
}

fn default_draft_count() -> usize {
    3
}

async fn proactive(
    State(state): State<AppState>,
    Json(req): Json<ProactiveRequest>,
) -> AppResult<Json<Vec<Post>>> {
    let posts = generate_drafts(state.backend(), state.language(), &req.post_type, req.count).await?;
    for post in &posts {
        drafts::save(&state.store, post)?;
    }
    Ok(Json(posts))
}

// --- Drafts ---

async fn list_drafts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(drafts::list(&state.store)?))
}

async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    Ok(Json(drafts::get(&state.store, &id)?))
}

async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<DraftUpdate>,
) -> AppResult<Json<Post>> {
    Ok(Json(drafts::update(&state.store, &id, changes)?))
}

async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    drafts::delete(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn draft_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = drafts::find(&state.store, &id)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format_for_clipboard(&post),
    )
        .into_response())
}

/// The draft's image with its meme text burned in, as a download.
async fn draft_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = drafts::find(&state.store, &id)?;
    let mut image = post.image.clone().ok_or(AppError::NotFound)?;

    let composite = state
        .compositor
        .composite_async(
            Bytes::from(std::mem::take(&mut image.bytes)),
            post.caption().map(str::to_string),
            post.meme_text_color.clone(),
            post.meme_stroke_color.clone(),
        )
        .await;

    image.mime_type = composite.mime_type(&image.mime_type).to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        image_filename(&post, image.extension())
    );
    let mime = image.mime_type;

    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        composite.into_bytes(),
    )
        .into_response())
}

// --- Favorites ---

async fn list_favorites(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(drafts::favorites(&state.store)?))
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(post): Json<Post>,
) -> AppResult<(StatusCode, Json<Post>)> {
    drafts::add_favorite(&state.store, &post)?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteStatus {
    is_favorite: bool,
}

/// Lets the draft list render the star without fetching every favorite.
async fn favorite_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<FavoriteStatus>> {
    Ok(Json(FavoriteStatus {
        is_favorite: drafts::is_favorite(&state.store, &id)?,
    }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    drafts::remove_favorite(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Compositor ---

/// Multipart fields: `image` (file), `caption`, `fill`, `stroke`.
async fn composite(State(state): State<AppState>, uploads: Uploads) -> AppResult<Response> {
    let image = uploads
        .file("image")
        .ok_or_else(|| AppError::BadRequest("An 'image' file is required".to_string()))?;
    let original_mime = image
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let composite = state
        .compositor
        .composite_async(
            image.data.clone(),
            uploads.text("caption"),
            uploads.text("fill"),
            uploads.text("stroke"),
        )
        .await;

    let mime = composite.mime_type(&original_mime).to_string();
    Ok(([(header::CONTENT_TYPE, mime)], composite.into_bytes()).into_response())
}
