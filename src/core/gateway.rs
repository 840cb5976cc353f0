//! Inbound operations on top of the resolver and dispatcher.
//!
//! [`Gateway::gemini`] serves the generate/validate routing call and
//! [`Gateway::proxy_research`] the single-provider research call. Both are
//! transport-agnostic; the HTTP server and the CLI call them directly.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use super::dispatcher::{AttemptRecord, DispatchOutcome, Dispatcher};
use super::guard::EndpointGuard;
use super::http::build_client;
use super::normalize::{chat_envelope, extract_text};
use super::provider::{Provider, ProviderRegistry, Secrets};
use super::resolver::{Operation, ResolveRequest, Resolver};
use crate::error::{NewsroomError, Result};
use crate::storage::config::Config;

/// System instruction used for research calls.
pub const RESEARCH_INSTRUCTION: &str = "You are a research assistant for a news desk. \
Find recent, verifiable developments about the user's topic. Respond only with a JSON \
array of objects with the fields \"title\", \"summary\" and \"source\".";

/// Body of the generate/validate routing call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCallRequest {
    #[serde(default)]
    pub operation: Operation,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_candidates: Vec<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// Status code and JSON body for a routing call.
#[derive(Debug, Clone)]
pub struct GeminiCallResponse {
    pub status: u16,
    pub body: Value,
}

impl GeminiCallResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn ok(&self) -> bool {
        self.body.get("ok").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Attempt trail carried by the body, if any.
    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.body
            .get("attempts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Body of the proxy-research call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyResearchRequest {
    pub provider: String,
    pub query: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Routing front door shared by the server, the CLI and the agent pipeline.
#[derive(Debug, Clone)]
pub struct Gateway {
    resolver: Resolver,
    dispatcher: Dispatcher,
    guard: EndpointGuard,
    research_model: Option<String>,
}

impl Gateway {
    #[must_use]
    pub const fn new(resolver: Resolver, dispatcher: Dispatcher, guard: EndpointGuard) -> Self {
        Self {
            resolver,
            dispatcher,
            guard,
            research_model: None,
        }
    }

    /// Wire a gateway from configuration and environment secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config, secrets: Secrets) -> Result<Self> {
        let timeout = Duration::from_secs(config.general.timeout_seconds);
        let guard = EndpointGuard::new().with_extra_hosts(&config.security.extra_allowed_hosts);
        let dispatcher = Dispatcher::new(build_client(timeout)?, guard.clone(), timeout);
        let resolver = Resolver::new(ProviderRegistry::new(), secrets)
            .with_gemini_base_urls(config.gemini.base_urls.clone())
            .with_gemini_models(config.gemini.models.clone());

        Ok(Self::new(resolver, dispatcher, guard)
            .with_research_model(config.gemini.research_model.clone()))
    }

    /// Model used for Gemini research when the caller names none.
    #[must_use]
    pub fn with_research_model(mut self, model: Option<String>) -> Self {
        self.research_model = model.filter(|m| !m.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub const fn guard(&self) -> &EndpointGuard {
        &self.guard
    }

    /// Run a Gemini generate call and return the raw dispatch outcome.
    pub async fn generate(
        &self,
        caller_key: Option<String>,
        model_candidates: Vec<String>,
        body: &Value,
    ) -> DispatchOutcome {
        let attempts = self.resolver.resolve_attempts(&ResolveRequest {
            caller_key,
            model_candidates,
            ..ResolveRequest::gemini(Operation::Generate)
        });
        self.dispatcher.dispatch(Operation::Generate, attempts, body).await
    }

    /// Serve the generate/validate routing call.
    pub async fn gemini(&self, request: GeminiCallRequest) -> GeminiCallResponse {
        match request.operation {
            Operation::Validate => self.validate(request).await,
            Operation::Generate => {
                let Some(body) = request.body else {
                    let error = NewsroomError::InvalidRequest("missing body".to_string());
                    return GeminiCallResponse::new(
                        error.http_status(),
                        json!({"ok": false, "error": error.to_string()}),
                    );
                };
                let outcome = self
                    .generate(request.api_key, request.model_candidates, &body)
                    .await;
                match outcome.result {
                    Ok(success) => GeminiCallResponse::new(
                        200,
                        json!({
                            "ok": true,
                            "payload": success.payload,
                            "model": success.model,
                            "baseUrl": success.base_url,
                        }),
                    ),
                    Err(error) => GeminiCallResponse::new(
                        error.http_status(),
                        json!({
                            "ok": false,
                            "error": error.to_string(),
                            "attempts": outcome.attempts,
                        }),
                    ),
                }
            }
        }
    }

    async fn validate(&self, request: GeminiCallRequest) -> GeminiCallResponse {
        let attempts = self.resolver.resolve_attempts(&ResolveRequest {
            caller_key: request.api_key,
            model_candidates: request.model_candidates,
            ..ResolveRequest::gemini(Operation::Validate)
        });
        let outcome = self
            .dispatcher
            .dispatch(Operation::Validate, attempts, &Value::Null)
            .await;

        match outcome.result {
            Ok(_) => GeminiCallResponse::new(200, json!({"ok": true, "attempts": outcome.attempts})),
            Err(error) => GeminiCallResponse::new(
                error.http_status(),
                json!({
                    "ok": false,
                    "error": error.to_string(),
                    "attempts": outcome.attempts,
                }),
            ),
        }
    }

    /// Serve the proxy-research call.
    ///
    /// A supplied endpoint is checked against the allow-list before anything
    /// else, including key resolution. Exactly one upstream call is made,
    /// even for Gemini. Gemini answers are reshaped into a chat completion
    /// envelope; other providers' JSON is returned as is.
    ///
    /// # Errors
    ///
    /// `UnauthorizedEndpoint` for a disallowed endpoint, configuration errors
    /// for unknown providers or missing keys, `AllAttemptsFailed` when the
    /// provider call fails.
    pub async fn proxy_research(&self, request: ProxyResearchRequest) -> Result<Value> {
        let provider = Provider::from_cli_name(&request.provider)?;
        let endpoint = request
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        if let Some(target) = endpoint {
            if !self.guard.is_authorized_endpoint(target, provider) {
                return Err(NewsroomError::UnauthorizedEndpoint {
                    endpoint: target.to_string(),
                });
            }
        }
        let config = self.resolver.registry().get(provider);
        let endpoint = self.guard.resolve_endpoint(config, endpoint)?;

        let query = request.query.trim();
        if query.is_empty() {
            return Err(NewsroomError::InvalidRequest("query is required".to_string()));
        }

        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .or_else(|| provider.is_gemini_class().then(|| self.research_model.clone()).flatten());

        let mut attempts = self.resolver.resolve_attempts(&ResolveRequest {
            operation: Operation::Generate,
            provider: Some(provider),
            caller_key: None,
            model_candidates: model.into_iter().collect(),
            endpoint_override: Some(endpoint),
        });
        // One call per research request: first key, first model, first base.
        attempts.truncate(1);
        if attempts.is_empty() {
            return Err(NewsroomError::NoKeysConfigured {
                provider: provider.cli_name().to_string(),
            });
        }

        tracing::info!(provider = %provider, "Proxy research call");

        if provider.is_gemini_class() {
            let body = json!({
                "systemInstruction": {"parts": [{"text": RESEARCH_INSTRUCTION}]},
                "contents": [{"role": "user", "parts": [{"text": query}]}],
                "tools": [{"google_search": {}}],
            });
            let outcome = self
                .dispatcher
                .dispatch(Operation::Generate, attempts, &body)
                .await;
            let success = outcome.result?;
            Ok(chat_envelope(&extract_text(&success.payload)))
        } else {
            let body = json!({
                "messages": [
                    {"role": "system", "content": RESEARCH_INSTRUCTION},
                    {"role": "user", "content": query},
                ],
            });
            let outcome = self
                .dispatcher
                .dispatch(Operation::Generate, attempts, &body)
                .await;
            Ok(outcome.result?.payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(pairs: &[(&str, &str)]) -> Gateway {
        let guard = EndpointGuard::new();
        let dispatcher = Dispatcher::new(reqwest::Client::new(), guard.clone(), Duration::from_secs(1));
        let resolver = Resolver::new(ProviderRegistry::new(), Secrets::from_pairs(pairs.iter().copied()));
        Gateway::new(resolver, dispatcher, guard)
    }

    #[tokio::test]
    async fn proxy_research_rejects_disallowed_endpoint_before_keys() {
        let gw = gateway(&[]);
        let err = gw
            .proxy_research(ProxyResearchRequest {
                provider: "custom".to_string(),
                query: "q".to_string(),
                endpoint: Some("http://10.0.0.1/v1".to_string()),
                ..ProxyResearchRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn proxy_research_unknown_provider_is_400() {
        let gw = gateway(&[]);
        let err = gw
            .proxy_research(ProxyResearchRequest {
                provider: "nope".to_string(),
                query: "q".to_string(),
                ..ProxyResearchRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn proxy_research_without_keys_is_400() {
        let gw = gateway(&[]);
        let err = gw
            .proxy_research(ProxyResearchRequest {
                provider: "kimi".to_string(),
                query: "q".to_string(),
                ..ProxyResearchRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NewsroomError::NoKeysConfigured { .. }));
    }

    #[tokio::test]
    async fn generate_without_body_is_400() {
        let gw = gateway(&[("GEMINI_API_KEY", "k")]);
        let response = gw.gemini(GeminiCallRequest::default()).await;
        assert_eq!(response.status, 400);
        assert!(!response.ok());
    }

    #[tokio::test]
    async fn validate_without_key_is_400() {
        let gw = gateway(&[]);
        let response = gw
            .gemini(GeminiCallRequest {
                operation: Operation::Validate,
                ..GeminiCallRequest::default()
            })
            .await;
        assert_eq!(response.status, 400);
        assert!(response.attempts().is_empty());
    }
}
