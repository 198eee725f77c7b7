use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::AppError;

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```").expect("valid regex")
    })
}

/// Returns the JSON payload of a model reply: the first fenced code block if
/// there is one, otherwise the trimmed text.
pub fn extract_json(text: &str) -> &str {
    fenced_block()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| text.trim())
}

/// Decodes a structured model reply. No repair is attempted.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, AppError> {
    let payload = extract_json(text);
    serde_json::from_str(payload).map_err(|e| {
        let preview: String = payload.chars().take(120).collect();
        AppError::MalformedOutput(format!("{} (in: {})", e, preview))
    })
}
