//! Response normalization.
//!
//! Pulls text and inline image data out of provider envelopes. Nothing here
//! fails: missing content comes back as an empty string or `None`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

/// Decoded inline binary part of a Gemini response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Render as a `data:` URI suitable for storing on an article.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

fn first_candidate_parts(payload: &Value) -> &[Value] {
    payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Concatenate every text part of the first candidate, in order, with no separator.
#[must_use]
pub fn extract_text(payload: &Value) -> String {
    first_candidate_parts(payload)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

/// First part carrying decodable inline data, if any.
#[must_use]
pub fn extract_inline_image(payload: &Value) -> Option<InlineImage> {
    first_candidate_parts(payload).iter().find_map(|part| {
        let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
        let encoded = inline.get("data").and_then(Value::as_str)?;
        let data = STANDARD.decode(encoded).ok()?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        Some(InlineImage { mime_type, data })
    })
}

/// Wrap text in an OpenAI-style chat completion envelope.
#[must_use]
pub fn chat_envelope(text: &str) -> Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": text}
        }]
    })
}

/// Message content of the first choice of a chat completion, or `""`.
#[must_use]
pub fn extract_chat_content(payload: &Value) -> String {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Remove a surrounding markdown code fence (with optional language tag).
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
