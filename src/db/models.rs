use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A generated or edited social post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(rename = "postContent")]
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meme_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meme_text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meme_stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub style: String,
    pub created_at: String,
}

impl Post {
    pub fn new(content: impl Into<String>, hashtags: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.into(),
            hashtags: normalize_hashtags(hashtags),
            sources: Vec::new(),
            image: None,
            meme_text: None,
            meme_text_color: None,
            meme_stroke_color: None,
            poll: None,
            topic: String::new(),
            style: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Meme text that should actually be drawn, if any.
    pub fn caption(&self) -> Option<&str> {
        self.meme_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Strips leading `#`, drops blanks and duplicates, keeps order.
pub fn normalize_hashtags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let cleaned = tag.trim().trim_start_matches('#').trim().to_string();
        if cleaned.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(&cleaned)) {
            continue;
        }
        out.push(cleaned);
    }
    out
}

/// A citation returned alongside search-grounded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub question: String,
    pub options: Vec<String>,
}

impl Poll {
    pub const MIN_OPTIONS: usize = 2;
    pub const MAX_OPTIONS: usize = 4;

    /// Builds a poll, trimming entries. Returns `None` when the shape is invalid.
    pub fn new(question: &str, options: Vec<String>) -> Option<Self> {
        let question = question.trim();
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if question.is_empty()
            || options.len() < Self::MIN_OPTIONS
            || options.len() > Self::MAX_OPTIONS
        {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            options,
        })
    }
}

/// Image bytes plus their media type. Serialized as a `data:` URI.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (mime_type, payload) = rest.split_once(";base64,")?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(mime_type, bytes))
    }

    /// File extension for downloads.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for InlineImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for InlineImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        InlineImage::from_data_uri(&raw)
            .ok_or_else(|| serde::de::Error::custom("expected a base64 data URI"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Image,
    Text,
}

/// Source material uploaded by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LibraryKind,
    /// Text content, or a data URI for images
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl LibraryItem {
    pub fn image(&self) -> Option<InlineImage> {
        match self.kind {
            LibraryKind::Image => InlineImage::from_data_uri(&self.data),
            LibraryKind::Text => None,
        }
    }
}

/// A post scheduled on a calendar day. Keyed by `date` (YYYY-MM-DD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPost {
    pub date: String,
    pub post_type: String,
    pub topic: String,
    pub post: Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub author: MessageAuthor,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            author: MessageAuthor::System,
            content: content.into(),
        }
    }
}
