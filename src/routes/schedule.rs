use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Datelike, Local, Timelike};
use serde::Serialize;

use crate::content::library;
use crate::content::scheduler::{
    self, LibrarySuggestion, PostTypeSuggestion, ScheduleStatus, TimeSlot, TimingAnalysis,
};
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/schedule", get(status))
        .route("/api/schedule/refresh", post(refresh))
        .route("/api/schedule/suggestion", get(suggestion))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    analysis: TimingAnalysis,
    slots: Vec<TimeSlot>,
    #[serde(flatten)]
    status: ScheduleStatus,
}

impl ScheduleResponse {
    fn now(analysis: TimingAnalysis) -> Self {
        let slots = scheduler::parse_slots(&analysis.text);
        let now = Local::now();
        let status = scheduler::status_at(
            &slots,
            now.weekday().num_days_from_sunday(),
            now.hour(),
        );
        Self {
            analysis,
            slots,
            status,
        }
    }
}

async fn status(State(state): State<AppState>) -> AppResult<Json<ScheduleResponse>> {
    let analysis = scheduler::analysis(&state.store, state.backend(), false).await?;
    Ok(Json(ScheduleResponse::now(analysis)))
}

async fn refresh(State(state): State<AppState>) -> AppResult<Json<ScheduleResponse>> {
    let analysis = scheduler::analysis(&state.store, state.backend(), true).await?;
    Ok(Json(ScheduleResponse::now(analysis)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionResponse {
    post_type: PostTypeSuggestion,
    #[serde(skip_serializing_if = "Option::is_none")]
    library: Option<LibrarySuggestion>,
}

/// What to post in the next good slot, plus a library item to build it from
/// when the library has any. A failed library pick is logged and left out.
async fn suggestion(State(state): State<AppState>) -> AppResult<Json<SuggestionResponse>> {
    let schedule = ScheduleResponse::now(
        scheduler::analysis(&state.store, state.backend(), false).await?,
    );
    let when = schedule
        .status
        .next_best_time
        .as_deref()
        .unwrap_or("right now");

    let post_type =
        scheduler::suggest_post_type(state.backend(), &schedule.analysis.text, when).await?;

    let items = library::list(&state.store)?;
    let library = if items.is_empty() {
        None
    } else {
        match scheduler::suggest_from_library(state.backend(), &post_type.post_type, &items).await
        {
            Ok(pick) => Some(pick),
            Err(e) => {
                tracing::warn!("Library suggestion failed: {}", e);
                None
            }
        }
    };

    Ok(Json(SuggestionResponse { post_type, library }))
}
