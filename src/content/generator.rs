use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::ai::prompts::{self, PostPrompt};
use crate::ai::{parse_structured, AspectRatio, GenerateRequest, GenerativeBackend, ImageRequest};
use crate::db::models::{LibraryItem, LibraryKind, Poll, Post};
use crate::error::{AppError, AppResult};

pub const MAX_PROACTIVE_DRAFTS: usize = 5;

const PROACTIVE_TOPIC: &str = "a current trend in the IT job market worth discussing today";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    #[default]
    None,
    Ai,
    Meme,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    pub topic: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub image_mode: ImageMode,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub library_item_id: Option<String>,
}

fn default_style() -> String {
    "Point of View".to_string()
}

fn default_tone() -> String {
    "professional".to_string()
}

impl GenerateOptions {
    pub fn new(topic: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            style: style.into(),
            tone: default_tone(),
            image_mode: ImageMode::None,
            aspect_ratio: AspectRatio::default(),
            library_item_id: None,
        }
    }

    pub fn with_image_mode(mut self, mode: ImageMode) -> Self {
        self.image_mode = mode;
        self
    }
}

/// Shape of the model's post reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedPost {
    post_content: String,
    #[serde(default)]
    hashtags: Vec<String>,
    meme_text: Option<String>,
    meme_text_color: Option<String>,
    meme_stroke_color: Option<String>,
    poll: Option<GeneratedPoll>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPoll {
    question: String,
    #[serde(default)]
    options: Vec<String>,
}

/// Writes one post. An image failure is logged and the post is returned
/// without an image.
pub async fn generate_post(
    backend: &dyn GenerativeBackend,
    language: &str,
    options: &GenerateOptions,
    library_item: Option<&LibraryItem>,
) -> AppResult<Post> {
    let topic = options.topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("A topic is required".to_string()));
    }

    let source_text = library_item
        .filter(|item| item.kind == LibraryKind::Text)
        .map(|item| item.data.as_str());
    let meme = options.image_mode == ImageMode::Meme;

    let prompt = prompts::post(&PostPrompt {
        topic,
        style: &options.style,
        tone: &options.tone,
        language,
        meme,
        source_text,
    });
    let request = GenerateRequest::new(prompt)
        .with_schema(prompts::post_schema())
        .with_web_search();

    let response = backend.generate(request).await?;
    let generated: GeneratedPost = parse_structured(&response.text)?;

    if generated.post_content.trim().is_empty() {
        return Err(AppError::MalformedOutput(
            "post content was empty".to_string(),
        ));
    }

    let mut post = Post::new(generated.post_content.trim(), generated.hashtags);
    post.sources = response.sources;
    post.topic = topic.to_string();
    post.style = options.style.clone();
    post.poll = generated
        .poll
        .and_then(|p| Poll::new(&p.question, p.options));

    if meme {
        post.meme_text = generated
            .meme_text
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(topic.to_string()));
        post.meme_text_color = generated.meme_text_color;
        post.meme_stroke_color = generated.meme_stroke_color;
    }

    post.image = match library_item.and_then(LibraryItem::image) {
        Some(image) => Some(image),
        None if options.image_mode != ImageMode::None => {
            let request = ImageRequest {
                prompt: prompts::image(topic, meme),
                aspect_ratio: options.aspect_ratio,
            };
            match backend.generate_image(request).await {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("Image generation failed for '{}': {}", topic, e);
                    None
                }
            }
        }
        None => None,
    };

    tracing::info!(
        "Generated post {} ({} chars, image: {})",
        post.id,
        post.content.len(),
        post.image.is_some()
    );
    Ok(post)
}

/// Writes `count` drafts of one post type concurrently. Individual failures
/// are skipped; the call fails only when every draft failed.
pub async fn generate_drafts(
    backend: &dyn GenerativeBackend,
    language: &str,
    post_type: &str,
    count: usize,
) -> AppResult<Vec<Post>> {
    if count == 0 || count > MAX_PROACTIVE_DRAFTS {
        return Err(AppError::BadRequest(format!(
            "Draft count must be between 1 and {}",
            MAX_PROACTIVE_DRAFTS
        )));
    }
    let post_type = post_type.trim();
    if post_type.is_empty() {
        return Err(AppError::BadRequest("A post type is required".to_string()));
    }

    let options = GenerateOptions::new(PROACTIVE_TOPIC, post_type);
    let results = join_all(
        (0..count).map(|_| generate_post(backend, language, &options, None)),
    )
    .await;

    let mut drafts = Vec::with_capacity(count);
    let mut first_error = None;
    for result in results {
        match result {
            Ok(post) => drafts.push(post),
            Err(e) => {
                tracing::warn!("Proactive draft failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    match (drafts.is_empty(), first_error) {
        (true, Some(e)) => Err(e),
        _ => Ok(drafts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::ai::BackendError;
    use crate::db::models::InlineImage;

    const REPLY: &str =
        r##"{"postContent": "Headline\n\nBody", "hashtags": ["#Cloud", "cloud", "AI"]}"##;

    #[tokio::test]
    async fn text_only_post() {
        let backend = ScriptedBackend::new().reply(REPLY);
        let options = GenerateOptions::new("Cloud", "Quick Tip");
        let post = generate_post(&backend, "it", &options, None).await.unwrap();
        assert_eq!(post.content, "Headline\n\nBody");
        assert_eq!(post.hashtags, vec!["Cloud", "AI"]);
        assert!(post.image.is_none());
        assert!(post.meme_text.is_none());
        assert_eq!(post.topic, "Cloud");
        assert_eq!(backend.image_calls(), 0);
        assert!(backend.requests()[0].web_search);
    }

    #[tokio::test]
    async fn meme_mode_falls_back_to_topic_caption() {
        let backend = ScriptedBackend::new().reply(REPLY);
        let options =
            GenerateOptions::new("Legacy code", "Meme").with_image_mode(ImageMode::Meme);
        let post = generate_post(&backend, "it", &options, None).await.unwrap();
        assert_eq!(post.meme_text.as_deref(), Some("Legacy code"));
        assert!(post.image.is_some());
    }

    #[tokio::test]
    async fn meme_fields_come_from_the_reply() {
        let reply = r##"{"postContent": "x", "hashtags": [], "memeText": "It works on my machine",
            "memeTextColor": "#ffff00", "poll": {"question": "Tabs?", "options": ["Yes", "No"]}}"##;
        let backend = ScriptedBackend::new().reply(reply);
        let options = GenerateOptions::new("Bugs", "Poll").with_image_mode(ImageMode::Meme);
        let post = generate_post(&backend, "it", &options, None).await.unwrap();
        assert_eq!(post.caption(), Some("It works on my machine"));
        assert_eq!(post.meme_text_color.as_deref(), Some("#ffff00"));
        assert_eq!(post.poll.unwrap().options, vec!["Yes", "No"]);
    }

    #[tokio::test]
    async fn image_failure_keeps_the_post() {
        let backend = ScriptedBackend::new().reply(REPLY).failing_images();
        let options = GenerateOptions::new("Cloud", "Quick Tip").with_image_mode(ImageMode::Ai);
        let post = generate_post(&backend, "it", &options, None).await.unwrap();
        assert!(post.image.is_none());
        assert_eq!(backend.image_calls(), 1);
    }

    #[tokio::test]
    async fn library_text_is_used_as_source() {
        let backend = ScriptedBackend::new().reply(REPLY);
        let item = LibraryItem {
            id: "n1".into(),
            name: "notes.md".into(),
            kind: LibraryKind::Text,
            data: "Rust adoption figures".into(),
            mime_type: None,
        };
        let options = GenerateOptions::new("Rust", "Tech News");
        generate_post(&backend, "en", &options, Some(&item))
            .await
            .unwrap();
        assert!(backend.requests()[0].prompt.contains("Rust adoption figures"));
    }

    #[tokio::test]
    async fn library_image_becomes_post_image() {
        let backend = ScriptedBackend::new().reply(REPLY);
        let image = InlineImage::new("image/png", vec![1, 2, 3]);
        let item = LibraryItem {
            id: "i1".into(),
            name: "team.png".into(),
            kind: LibraryKind::Image,
            data: image.to_data_uri(),
            mime_type: Some("image/png".into()),
        };
        let options =
            GenerateOptions::new("Team", "Point of View").with_image_mode(ImageMode::Ai);
        let post = generate_post(&backend, "it", &options, Some(&item))
            .await
            .unwrap();
        assert_eq!(post.image, Some(image));
        assert_eq!(backend.image_calls(), 0);
    }

    #[tokio::test]
    async fn unparsable_reply_is_malformed() {
        let backend = ScriptedBackend::new().reply("Sorry, no JSON today");
        let options = GenerateOptions::new("Cloud", "Quick Tip");
        let err = generate_post(&backend, "it", &options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn blank_topic_is_rejected() {
        let backend = ScriptedBackend::new();
        let options = GenerateOptions::new("  ", "Quick Tip");
        let err = generate_post(&backend, "it", &options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn proactive_drafts_skip_failures() {
        let backend = ScriptedBackend::new()
            .reply(REPLY)
            .fail(BackendError::Timeout)
            .reply(REPLY);
        let drafts = generate_drafts(&backend, "it", "Question", 3).await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert_ne!(drafts[0].id, drafts[1].id);
    }

    #[tokio::test]
    async fn proactive_drafts_fail_when_all_fail() {
        let backend = ScriptedBackend::new().fail(BackendError::Quota);
        let err = generate_drafts(&backend, "it", "Question", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Backend(BackendError::Quota)));
    }

    #[tokio::test]
    async fn proactive_draft_count_is_bounded() {
        let backend = ScriptedBackend::new();
        assert!(generate_drafts(&backend, "it", "Question", 0).await.is_err());
        assert!(generate_drafts(&backend, "it", "Question", 6).await.is_err());
    }
}
