use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::ai::prompts::language_name;
use crate::db::Collection;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub draft_count: i64,
    pub favorite_count: i64,
    pub library_count: i64,
    pub planned_count: i64,
    pub backend_configured: bool,
    pub language: String,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(State(state): State<AppState>) -> AppResult<Response> {
    let store = &state.store;
    Ok(Html(HomeTemplate {
        draft_count: store.count(Collection::Drafts)?,
        favorite_count: store.count(Collection::Favorites)?,
        library_count: store.count(Collection::Library)?,
        planned_count: store.count(Collection::Calendar)?,
        backend_configured: !state.config.ai.api_key.is_empty(),
        language: language_name(&state.config.ai.language).to_string(),
    })
    .into_response())
}
