//! Generative-AI backend seam.
//!
//! Everything that talks to a language or image model goes through
//! [`GenerativeBackend`], so handlers and services can be exercised with a
//! scripted backend in tests.

pub mod gemini;
pub mod parse;
pub mod prompts;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{ChatTurn, GroundingSource, InlineImage};

pub use gemini::GeminiClient;
pub use parse::parse_structured;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("request timed out")]
    Timeout,

    #[error("quota exhausted")]
    Quota,

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned no content")]
    EmptyResponse,

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::NotConfigured)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Which model family serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    #[default]
    Fast,
    /// Slower model with an extended reasoning budget
    Thinking,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub tier: ModelTier,
    pub prompt: String,
    /// Earlier turns of a conversation, oldest first
    pub history: Vec<ChatTurn>,
    /// JSON schema the response must conform to
    pub response_schema: Option<serde_json::Value>,
    pub image: Option<InlineImage>,
    pub web_search: bool,
    pub thinking_budget: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, image: Option<InlineImage>) -> Self {
        self.image = image;
        self
    }

    pub fn thinking(mut self, budget: u32) -> Self {
        self.tier = ModelTier::Thinking;
        self.thinking_budget = Some(budget);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Tall,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Tall => "3:4",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, BackendError>;

    async fn generate_image(&self, request: ImageRequest) -> Result<InlineImage, BackendError>;
}
