//! Conversational refinement of a single post.
//!
//! A [`RefinementSession`] is a plain value holding the conversation so far.
//! Callers load it, pass it to [`send`], and store it back; concurrent
//! sessions share nothing.

use serde::{Deserialize, Serialize};

use crate::ai::prompts;
use crate::ai::{parse_structured, GenerateRequest, GenerativeBackend};
use crate::db::models::{normalize_hashtags, ChatTurn, Poll, Post};
use crate::db::{Collection, SqliteStore};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementSession {
    pub id: String,
    pub post_id: String,
    pub history: Vec<ChatTurn>,
    pub created_at: String,
}

impl RefinementSession {
    /// Seeds the conversation with the editor persona, the draft and the
    /// assistant's acknowledgement.
    pub fn start(post: &Post) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            post_id: post.id.clone(),
            history: vec![
                ChatTurn::user(prompts::refinement_opening(post)),
                ChatTurn::assistant(prompts::REFINEMENT_ACK),
            ],
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// What the assistant decided to do with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AssistantAction {
    Reply {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Rewrite {
        post_content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hashtags: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SetMemeText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke_color: Option<String>,
    },
    AddPoll {
        question: String,
        options: Vec<String>,
    },
    RemovePoll,
    SetHashtags {
        hashtags: Vec<String>,
    },
}

impl AssistantAction {
    /// Decodes a model reply; anything that is not a known action is kept
    /// as a plain reply.
    pub fn decode(text: &str) -> Self {
        match parse_structured::<AssistantAction>(text) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!("Refinement reply is not an action, keeping text: {}", e);
                AssistantAction::Reply {
                    text: text.trim().to_string(),
                }
            }
        }
    }

    /// The line shown in the conversation for this action.
    pub fn summary(&self) -> String {
        match self {
            AssistantAction::Reply { text } => text.clone(),
            AssistantAction::Rewrite { note, .. } => note
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "I rewrote the post.".to_string()),
            AssistantAction::SetMemeText { text, .. } => {
                format!("Meme text set to \"{}\".", text)
            }
            AssistantAction::AddPoll { question, .. } => format!("Added a poll: {}", question),
            AssistantAction::RemovePoll => "Removed the poll.".to_string(),
            AssistantAction::SetHashtags { hashtags } => {
                let tags: Vec<String> = normalize_hashtags(hashtags.clone())
                    .into_iter()
                    .map(|t| format!("#{}", t))
                    .collect();
                format!("Hashtags updated: {}", tags.join(" "))
            }
        }
    }

    /// Applies the action to `post`. Returns whether the post changed.
    pub fn apply(&self, post: &mut Post) -> AppResult<bool> {
        match self {
            AssistantAction::Reply { .. } => Ok(false),
            AssistantAction::Rewrite {
                post_content,
                hashtags,
                ..
            } => {
                let content = post_content.trim();
                if content.is_empty() {
                    return Err(AppError::MalformedOutput(
                        "rewrite without post content".to_string(),
                    ));
                }
                post.content = content.to_string();
                if let Some(tags) = hashtags {
                    post.hashtags = normalize_hashtags(tags.clone());
                }
                Ok(true)
            }
            AssistantAction::SetMemeText {
                text,
                color,
                stroke_color,
            } => {
                post.meme_text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                if color.is_some() {
                    post.meme_text_color = color.clone();
                }
                if stroke_color.is_some() {
                    post.meme_stroke_color = stroke_color.clone();
                }
                Ok(true)
            }
            AssistantAction::AddPoll { question, options } => {
                let poll = Poll::new(question, options.clone()).ok_or_else(|| {
                    AppError::MalformedOutput("poll needs a question and 2-4 options".to_string())
                })?;
                post.poll = Some(poll);
                Ok(true)
            }
            AssistantAction::RemovePoll => Ok(post.poll.take().is_some()),
            AssistantAction::SetHashtags { hashtags } => {
                post.hashtags = normalize_hashtags(hashtags.clone());
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineOutcome {
    pub action: AssistantAction,
    pub message: String,
    pub post_changed: bool,
}

/// One refinement turn. On success both turns are appended to the session
/// and `post` reflects the action; on failure neither is touched.
pub async fn send(
    backend: &dyn GenerativeBackend,
    session: &mut RefinementSession,
    post: &mut Post,
    message: &str,
) -> AppResult<RefineOutcome> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is empty".to_string()));
    }

    let request = GenerateRequest::new(prompts::refinement_turn(message, post))
        .with_history(session.history.clone())
        .with_schema(prompts::refinement_schema());
    let response = backend.generate(request).await?;

    let action = AssistantAction::decode(&response.text);
    let mut updated = post.clone();
    let post_changed = action.apply(&mut updated)?;
    *post = updated;

    let summary = action.summary();
    session.history.push(ChatTurn::user(message));
    session.history.push(ChatTurn::assistant(summary.clone()));

    Ok(RefineOutcome {
        action,
        message: summary,
        post_changed,
    })
}

/// One-shot deep analysis on the reasoning model.
pub async fn analyze(
    backend: &dyn GenerativeBackend,
    thinking_budget: u32,
    query: &str,
) -> AppResult<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Query is empty".to_string()));
    }
    let response = backend
        .generate(GenerateRequest::new(query).thinking(thinking_budget))
        .await?;
    Ok(response.text)
}

// --- Persistence ---

pub fn load(store: &SqliteStore, id: &str) -> AppResult<RefinementSession> {
    store
        .get(Collection::Sessions, id)?
        .ok_or(AppError::NotFound)
}

pub fn save(store: &SqliteStore, session: &RefinementSession) -> AppResult<()> {
    store.put(Collection::Sessions, &session.id, session)?;
    Ok(())
}

pub fn end(store: &SqliteStore, id: &str) -> AppResult<()> {
    if store.remove(Collection::Sessions, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}
