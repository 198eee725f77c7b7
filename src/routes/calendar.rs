use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::content::planner;
use crate::db::models::{PlannedPost, Post};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendar", get(list).post(accept))
        .route("/api/calendar/plan", post(plan))
        .route("/api/calendar/{date}", delete(remove))
}

#[derive(Deserialize)]
struct MonthQuery {
    year: Option<i32>,
    month: Option<u32>,
}

/// With `year` and `month` the response is a month view for the calendar
/// grid; without, every planned post.
async fn list(State(state): State<AppState>, Query(q): Query<MonthQuery>) -> AppResult<Response> {
    match (q.year, q.month) {
        (Some(year), Some(month)) => {
            Ok(Json(planner::month_view(&state.store, year, month)?).into_response())
        }
        (None, None) => Ok(Json(planner::list(&state.store, None)?).into_response()),
        _ => Err(AppError::BadRequest(
            "Pass both year and month, or neither".to_string(),
        )),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptRequest {
    date: String,
    post_type: String,
    topic: String,
    post: Post,
}

async fn accept(
    State(state): State<AppState>,
    Json(req): Json<AcceptRequest>,
) -> AppResult<(StatusCode, Json<PlannedPost>)> {
    let entry =
        planner::accept_suggestion(&state.store, &req.date, &req.post_type, &req.topic, req.post)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
struct PlanRequest {
    year: i32,
    month: u32,
}

async fn plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> AppResult<Json<Vec<PlannedPost>>> {
    let planned = planner::generate_plan(
        &state.store,
        state.backend(),
        state.language(),
        req.year,
        req.month,
    )
    .await?;
    Ok(Json(planned))
}

async fn remove(State(state): State<AppState>, Path(date): Path<String>) -> AppResult<StatusCode> {
    planner::remove(&state.store, &date)?;
    Ok(StatusCode::NO_CONTENT)
}
