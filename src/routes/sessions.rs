use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::content::drafts;
use crate::content::refine::{self, RefineOutcome, RefinementSession};
use crate::db::models::Post;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(start))
        .route("/api/sessions/{id}", get(history).delete(end))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/analyze", post(analyze))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    post_id: String,
}

async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> AppResult<(StatusCode, Json<RefinementSession>)> {
    let post = drafts::find(&state.store, &req.post_id)?;
    let session = RefinementSession::start(&post);
    refine::save(&state.store, &session)?;
    tracing::info!("Started refinement session {} for post {}", session.id, post.id);
    Ok((StatusCode::CREATED, Json(session)))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RefinementSession>> {
    Ok(Json(refine::load(&state.store, &id)?))
}

async fn end(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    refine::end(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    #[serde(flatten)]
    outcome: RefineOutcome,
    post: Post,
}

/// One refinement turn. The session and the edited draft are written back
/// only after the backend answered.
async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> AppResult<Json<MessageResponse>> {
    let mut session = refine::load(&state.store, &id)?;
    let mut post = drafts::find(&state.store, &session.post_id)?;

    let outcome = refine::send(state.backend(), &mut session, &mut post, &req.message).await?;

    refine::save(&state.store, &session)?;
    if outcome.post_changed {
        drafts::save(&state.store, &post)?;
    }

    Ok(Json(MessageResponse { outcome, post }))
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    query: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    text: String,
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let text = refine::analyze(state.backend(), state.config.ai.thinking_budget, &req.query).await?;
    Ok(Json(AnalyzeResponse { text }))
}
