use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::content::query::{self, QueryAnswer};
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/query", post(ask))
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

async fn ask(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> AppResult<Json<QueryAnswer>> {
    let today = chrono::Local::now().date_naive();
    let answer = query::ask(
        &state.store,
        state.backend(),
        &state.config.ai,
        &req.query,
        today,
    )
    .await?;
    Ok(Json(answer))
}
