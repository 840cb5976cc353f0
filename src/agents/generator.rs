//! Text and image generation seam for the agent pipeline.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::core::gateway::Gateway;
use crate::core::normalize::{InlineImage, extract_inline_image, extract_text, strip_code_fence};
use crate::core::provider::Provider;
use crate::error::{NewsroomError, Result};

/// Text generation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRequest {
    pub system_instruction: String,
    pub prompt: String,
    /// Attach the search grounding tool.
    pub use_search: bool,
}

/// Produces article drafts and companion images.
pub trait ContentGenerator: Send + Sync {
    /// Whether a text generation key is available.
    fn is_configured(&self) -> bool;

    /// Generate an HTML draft. Code fences are already stripped; an empty
    /// draft is an error.
    fn generate_article<'a>(&'a self, request: &'a ArticleRequest) -> BoxFuture<'a, Result<String>>;

    /// Generate an image. `Ok(None)` means the provider returned no image data.
    fn generate_image<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Option<InlineImage>>>;
}

/// Generator backed by the Gemini routing gateway.
#[derive(Debug, Clone)]
pub struct DispatchGenerator {
    gateway: Arc<Gateway>,
    image_model: String,
}

impl DispatchGenerator {
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, image_model: impl Into<String>) -> Self {
        Self {
            gateway,
            image_model: image_model.into(),
        }
    }

    fn article_body(request: &ArticleRequest) -> Value {
        let mut body = json!({
            "systemInstruction": {"parts": [{"text": request.system_instruction}]},
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": {"temperature": 0.9},
        });
        if request.use_search {
            body["tools"] = json!([{"google_search": {}}]);
        }
        body
    }

    fn image_body(prompt: &str) -> Value {
        json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"],
                "imageConfig": {"aspectRatio": "16:9"},
            },
        })
    }
}

impl ContentGenerator for DispatchGenerator {
    fn is_configured(&self) -> bool {
        self.gateway.resolver().has_server_key(Provider::Gemini)
    }

    fn generate_article<'a>(&'a self, request: &'a ArticleRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let body = Self::article_body(request);
            let outcome = self.gateway.generate(None, Vec::new(), &body).await;
            let success = outcome.result?;
            let text = extract_text(&success.payload);
            let draft = strip_code_fence(&text);
            if draft.is_empty() {
                return Err(NewsroomError::EmptyContent(format!(
                    "{} ({})",
                    success.provider, success.model
                )));
            }
            Ok(draft.to_string())
        })
    }

    fn generate_image<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Option<InlineImage>>> {
        Box::pin(async move {
            let body = Self::image_body(prompt);
            let outcome = self
                .gateway
                .generate(None, vec![self.image_model.clone()], &body)
                .await;
            Ok(extract_inline_image(&outcome.result?.payload))
        })
    }
}
