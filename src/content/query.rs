use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::generator::{generate_post, GenerateOptions, ImageMode};
use super::planner;
use crate::ai::prompts;
use crate::ai::{parse_structured, GenerateRequest, GenerativeBackend};
use crate::config::AiConfig;
use crate::db::models::Post;
use crate::db::SqliteStore;
use crate::error::{AppError, AppResult};

const PLAN_CONTEXT_LIMIT: usize = 14;

/// The planning assistant's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryReply {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Suggestion {
        date: String,
        post_type: String,
        topic: String,
    },
}

impl QueryReply {
    /// Decodes a model reply, keeping anything unrecognised as text.
    pub fn decode(raw: &str) -> Self {
        parse_structured::<QueryReply>(raw).unwrap_or_else(|_| QueryReply::Text {
            text: raw.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub reply: QueryReply,
    /// Full draft for a suggestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

/// Answers a free-form planning question. Suggestions come back with a
/// generated draft; whether it gets an image is a coin flip weighted by
/// `suggestion_image_chance`.
pub async fn ask(
    store: &SqliteStore,
    backend: &dyn GenerativeBackend,
    config: &AiConfig,
    query: &str,
    today: NaiveDate,
) -> AppResult<QueryAnswer> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Query is empty".to_string()));
    }

    let with_image = roll_image(config.suggestion_image_chance);

    let planned: Vec<String> = planner::upcoming(store, today)?
        .into_iter()
        .take(PLAN_CONTEXT_LIMIT)
        .map(|p| format!("{}: {} - {}", p.date, p.post_type, p.topic))
        .collect();

    let request = GenerateRequest::new(prompts::quick_query(
        query,
        &today.format("%Y-%m-%d").to_string(),
        &planned,
    ))
    .with_schema(prompts::quick_query_schema());
    let response = backend.generate(request).await?;
    let reply = QueryReply::decode(&response.text);

    let post = match &reply {
        QueryReply::Text { .. } => None,
        QueryReply::Suggestion {
            post_type, topic, ..
        } => {
            let mode = if with_image { ImageMode::Ai } else { ImageMode::None };
            let options = GenerateOptions::new(topic.as_str(), post_type.as_str())
                .with_image_mode(mode);
            Some(generate_post(backend, &config.language, &options, None).await?)
        }
    };

    Ok(QueryAnswer { reply, post })
}

fn roll_image(chance: f64) -> bool {
    let p = if chance.is_finite() {
        chance.clamp(0.0, 1.0)
    } else {
        0.0
    };
    rand::thread_rng().gen_bool(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;

    fn store() -> SqliteStore {
        let pool = crate::db::memory_pool().unwrap();
        crate::db::run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
    }

    #[test]
    fn decodes_both_kinds_and_falls_back_to_text() {
        assert_eq!(
            QueryReply::decode(r#"{"kind": "text", "text": "Nothing planned."}"#),
            QueryReply::Text {
                text: "Nothing planned.".into()
            }
        );
        assert_eq!(
            QueryReply::decode(
                r#"{"kind": "suggestion", "date": "2025-05-06", "postType": "Poll", "topic": "Remote work"}"#
            ),
            QueryReply::Suggestion {
                date: "2025-05-06".into(),
                post_type: "Poll".into(),
                topic: "Remote work".into(),
            }
        );
        assert_eq!(
            QueryReply::decode("Tomorrow looks free."),
            QueryReply::Text {
                text: "Tomorrow looks free.".into()
            }
        );
    }

    #[tokio::test]
    async fn text_answers_carry_no_post() {
        let store = store();
        let backend = ScriptedBackend::new().reply("You have nothing planned.");
        let answer = ask(&store, &backend, &AiConfig::default(), "what's next?", today())
            .await
            .unwrap();
        assert!(answer.post.is_none());
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn suggestions_come_with_a_draft() {
        let store = store();
        planner::accept_suggestion(&store, "2025-05-07", "Meme", "Deploy Fridays", Post::new("x", vec![]))
            .unwrap();
        let backend = ScriptedBackend::new()
            .reply(r#"{"kind": "suggestion", "date": "2025-05-06", "postType": "Quick Tip", "topic": "Git"}"#)
            .reply(r#"{"postContent": "Use git bisect", "hashtags": ["git"]}"#);
        let config = AiConfig {
            suggestion_image_chance: 1.0,
            ..AiConfig::default()
        };

        let answer = ask(&store, &backend, &config, "what should I post tomorrow?", today())
            .await
            .unwrap();

        let post = answer.post.unwrap();
        assert_eq!(post.content, "Use git bisect");
        assert_eq!(post.style, "Quick Tip");
        assert!(post.image.is_some());
        assert!(backend.requests()[0].prompt.contains("Deploy Fridays"));
    }

    #[tokio::test]
    async fn zero_chance_means_no_image() {
        let store = store();
        let backend = ScriptedBackend::new()
            .reply(r#"{"kind": "suggestion", "date": "2025-05-06", "postType": "Poll", "topic": "AI"}"#)
            .reply(r#"{"postContent": "Vote!", "hashtags": []}"#);
        let config = AiConfig {
            suggestion_image_chance: 0.0,
            ..AiConfig::default()
        };
        let answer = ask(&store, &backend, &config, "idea for tomorrow?", today())
            .await
            .unwrap();
        assert!(answer.post.unwrap().image.is_none());
        assert_eq!(backend.image_calls(), 0);
    }
}
