use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{
    BackendError, GenerateRequest, GenerateResponse, GenerativeBackend, ImageRequest, ModelTier,
};
use crate::config::AiConfig;
use crate::db::models::{ChatTurn, GroundingSource, InlineImage, MessageAuthor};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini / Imagen REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    text_model: String,
    thinking_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.trim().to_string(),
            text_model: config.text_model.clone(),
            thinking_model: config.thinking_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.text_model,
            ModelTier::Thinking => &self.thinking_model,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(&format!("v1beta/models/{}:{}", model, method))
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        body: &Value,
    ) -> Result<T, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::NotConfigured);
        }

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::Quota);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, BackendError> {
        let url = self.endpoint(self.model_for(request.tier), "generateContent")?;
        let body = build_generate_body(&request);

        tracing::debug!(
            tier = ?request.tier,
            web_search = request.web_search,
            structured = request.response_schema.is_some(),
            "Calling generateContent"
        );

        let reply: GenerateContentResponse = self.post_json(url, &body).await?;
        reply.into_response()
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<InlineImage, BackendError> {
        let url = self.endpoint(&self.image_model, "predict")?;
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": request.aspect_ratio.as_str(),
                "outputMimeType": "image/jpeg",
            }
        });

        let reply: PredictResponse = self.post_json(url, &body).await?;
        reply.into_image()
    }
}

/// Builds the `generateContent` payload.
pub fn build_generate_body(request: &GenerateRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .filter(|turn| turn.author != MessageAuthor::System)
        .map(content_for_turn)
        .collect();

    let mut parts = vec![json!({ "text": request.prompt })];
    if let Some(image) = &request.image {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": image.to_base64(),
            }
        }));
    }
    contents.push(json!({ "role": "user", "parts": parts }));

    let mut body = json!({ "contents": contents });

    if request.web_search {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }

    let mut generation_config = serde_json::Map::new();
    // The API refuses a response schema when search tools are enabled; the
    // prompt describes the shape in that case.
    if let (Some(schema), false) = (&request.response_schema, request.web_search) {
        generation_config.insert("responseMimeType".into(), json!("application/json"));
        generation_config.insert("responseSchema".into(), schema.clone());
    }
    if let Some(budget) = request.thinking_budget {
        generation_config.insert("thinkingConfig".into(), json!({ "thinkingBudget": budget }));
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

fn content_for_turn(turn: &ChatTurn) -> Value {
    let role = match turn.author {
        MessageAuthor::Assistant => "model",
        _ => "user",
    };
    json!({ "role": role, "parts": [{ "text": turn.content }] })
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateContentResponse {
    fn into_response(self) -> Result<GenerateResponse, BackendError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(BackendError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        let sources = candidate
            .grounding_metadata
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| {
                        let uri = web.uri.filter(|u| !u.trim().is_empty())?;
                        Some(GroundingSource {
                            uri,
                            title: web.title,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerateResponse { text, sources })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

impl PredictResponse {
    fn into_image(self) -> Result<InlineImage, BackendError> {
        let prediction = self
            .predictions
            .into_iter()
            .find(|p| p.bytes_base64_encoded.is_some())
            .ok_or(BackendError::EmptyResponse)?;

        let payload = prediction.bytes_base64_encoded.unwrap_or_default();
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(InlineImage::new(
            prediction
                .mime_type
                .unwrap_or_else(|| "image/jpeg".to_string()),
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_history_then_prompt() {
        let request = GenerateRequest::new("make it shorter").with_history(vec![
            ChatTurn::system("ignored"),
            ChatTurn::user("draft"),
            ChatTurn::assistant("ok"),
        ]);
        let body = build_generate_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "make it shorter");
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn schema_is_sent_without_search() {
        let request = GenerateRequest::new("x").with_schema(json!({ "type": "OBJECT" }));
        let body = build_generate_body(&request);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn search_wins_over_schema() {
        let request = GenerateRequest::new("x")
            .with_schema(json!({ "type": "OBJECT" }))
            .with_web_search();
        let body = build_generate_body(&request);
        assert!(body["tools"][0].get("googleSearch").is_some());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn thinking_budget_and_inline_image() {
        let request = GenerateRequest::new("x")
            .thinking(2048)
            .with_image(Some(InlineImage::new("image/png", vec![0, 1])));
        let body = build_generate_body(&request);
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            2048
        );
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AAE=");
    }

    #[test]
    fn response_text_and_sources_are_extracted() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "Hello " },
                    { "text": "world" }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "web": { "title": "no uri" } },
                    {}
                ]}
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = parsed.into_response().unwrap();
        assert_eq!(response.text, "Hello world");
        assert_eq!(
            response.sources,
            vec![GroundingSource {
                uri: "https://a.example".into(),
                title: Some("A".into())
            }]
        );
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            parsed.into_response(),
            Err(BackendError::EmptyResponse)
        ));
    }

    #[test]
    fn prediction_is_decoded() {
        let parsed: PredictResponse = serde_json::from_value(json!({
            "predictions": [{ "bytesBase64Encoded": "AQID", "mimeType": "image/png" }]
        }))
        .unwrap();
        let image = parsed.into_image().unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let config = AiConfig {
            api_key: String::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            ..AiConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        let err = client.generate(GenerateRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured));
    }
}
