//! Research provider rotation.
//!
//! Each research call starts with the next provider in a fixed rotation and
//! falls back to the privileged provider once. The caller always gets a list,
//! possibly empty.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gateway::{Gateway, ProxyResearchRequest};
use super::normalize::{extract_chat_content, strip_code_fence};
use super::provider::Provider;
use crate::error::Result;

/// One research finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub source: String,
}

/// Process-wide rotation over research providers. Starts at zero, never resets.
#[derive(Debug)]
pub struct ResearchRotation {
    counter: AtomicUsize,
    providers: Vec<Provider>,
}

impl ResearchRotation {
    #[must_use]
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            providers,
        }
    }

    /// Provider for the next call. Advances the rotation.
    #[must_use]
    pub fn next_provider(&self) -> Provider {
        if self.providers.is_empty() {
            return Provider::Gemini;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        self.providers[index % self.providers.len()]
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    /// Research `query`, trying the rotated provider then the privileged one.
    pub async fn perform_research(&self, gateway: &Gateway, query: &str) -> Vec<ResearchItem> {
        let provider = self.next_provider();
        tracing::info!(provider = %provider, "Research call");

        match research_once(gateway, provider, query).await {
            Ok(payload) => parse_items(&payload),
            Err(error) if !provider.is_privileged() => {
                tracing::warn!(
                    provider = %provider,
                    error = %error,
                    "Research provider failed, falling back to gemini"
                );
                match research_once(gateway, Provider::Gemini, query).await {
                    Ok(payload) => parse_items(&payload),
                    Err(error) => {
                        tracing::warn!(error = %error, "Research fallback failed");
                        Vec::new()
                    }
                }
            }
            Err(error) => {
                tracing::warn!(provider = %provider, error = %error, "Research failed");
                Vec::new()
            }
        }
    }
}

impl Default for ResearchRotation {
    fn default() -> Self {
        Self::new(Provider::RESEARCH_ROTATION.to_vec())
    }
}

async fn research_once(gateway: &Gateway, provider: Provider, query: &str) -> Result<Value> {
    gateway
        .proxy_research(ProxyResearchRequest {
            provider: provider.cli_name().to_string(),
            query: query.to_string(),
            model: None,
            endpoint: None,
        })
        .await
}

/// Parse a chat completion whose content is a JSON array of findings.
///
/// Anything that is not an array of objects with a title yields an empty list.
#[must_use]
pub fn parse_items(payload: &Value) -> Vec<ResearchItem> {
    let content = extract_chat_content(payload);
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(strip_code_fence(&content)) else {
        tracing::debug!("Research content is not a JSON array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            let text = |field: &str| {
                entry
                    .get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            };
            Some(ResearchItem {
                title: title.to_string(),
                summary: text("summary"),
                source: text("source"),
            })
        })
        .collect()
}
