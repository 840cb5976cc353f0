//! Sequential attempt dispatcher.
//!
//! Tries resolved attempts strictly one at a time, stops at the first
//! success and keeps a record of every failure. A 429 abandons the remaining
//! base URLs of the current (key, model) pair only.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::timeout;

use super::guard::EndpointGuard;
use super::provider::{Provider, key_fingerprint};
use super::resolver::{Attempt, Operation};
use crate::error::{NewsroomError, Result};
use crate::util::format::truncate;

/// Longest provider error body kept in an attempt record.
const MAX_ERROR_DETAIL: usize = 500;

// =============================================================================
// Attempt Records
// =============================================================================

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Diagnostic record of one attempt. Never mutated once pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub key_fingerprint: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub duration_ms: u64,
}

/// Winning attempt and its parsed payload.
#[derive(Debug, Clone)]
pub struct DispatchSuccess {
    pub payload: Value,
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
}

/// Result of one dispatch together with the full attempt trail.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub operation: Operation,
    pub result: Result<DispatchSuccess>,
    pub attempts: Vec<AttemptRecord>,
}

impl DispatchOutcome {
    fn failure(operation: Operation, error: NewsroomError, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            operation,
            result: Err(error),
            attempts,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of failed attempts in the trail.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Failure)
            .count()
    }
}

/// Why a single attempt failed.
struct AttemptFailure {
    status: Option<u16>,
    error: NewsroomError,
}

impl AttemptFailure {
    const fn transport(error: NewsroomError) -> Self {
        Self {
            status: None,
            error,
        }
    }

    /// Provider answered with a non-success status.
    fn rejected(provider: Provider, status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            error: NewsroomError::ProviderApiError {
                provider: provider.cli_name().to_string(),
                status_code: status,
                message: truncate(body.trim(), MAX_ERROR_DETAIL),
            },
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Executes attempt lists against upstream providers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    guard: EndpointGuard,
    attempt_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(client: Client, guard: EndpointGuard, attempt_timeout: Duration) -> Self {
        Self {
            client,
            guard,
            attempt_timeout,
        }
    }

    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Run `attempts` in order until one succeeds.
    ///
    /// `body` is forwarded as the provider payload for generate. Validate
    /// sends a minimal request instead.
    pub async fn dispatch(
        &self,
        operation: Operation,
        attempts: Vec<Attempt>,
        body: &Value,
    ) -> DispatchOutcome {
        if attempts.is_empty() {
            return DispatchOutcome::failure(
                operation,
                NewsroomError::NoKeysConfigured {
                    provider: Provider::Gemini.cli_name().to_string(),
                },
                Vec::new(),
            );
        }

        let first_provider = attempts[0].provider;
        let mut rejected: Option<String> = None;
        let attempts = self.authorized(attempts, &mut rejected);
        if attempts.is_empty() {
            return DispatchOutcome::failure(
                operation,
                NewsroomError::UnauthorizedEndpoint {
                    endpoint: rejected.unwrap_or_else(|| first_provider.cli_name().to_string()),
                },
                Vec::new(),
            );
        }

        let mut records: Vec<AttemptRecord> = Vec::new();
        let mut abandoned: HashSet<(String, String)> = HashSet::new();
        let mut last_error = String::new();

        for attempt in &attempts {
            let pair = (attempt.key.clone(), attempt.model.clone());
            if abandoned.contains(&pair) {
                tracing::debug!(
                    provider = %attempt.provider,
                    model = %attempt.model,
                    base_url = %attempt.base_url,
                    "Skipping base URL after rate limit"
                );
                continue;
            }

            tracing::debug!(
                provider = %attempt.provider,
                model = %attempt.model,
                base_url = %attempt.base_url,
                key = %key_fingerprint(&attempt.key),
                operation = operation.as_str(),
                "Trying attempt"
            );

            let start = Instant::now();
            let result = match timeout(self.attempt_timeout, self.execute(operation, attempt, body)).await {
                Ok(result) => result,
                Err(_) => Err(AttemptFailure::transport(NewsroomError::Timeout(
                    self.attempt_timeout,
                ))),
            };
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(payload) => {
                    records.push(record(attempt, AttemptOutcome::Success, None, None, duration_ms));
                    tracing::info!(
                        provider = %attempt.provider,
                        model = %attempt.model,
                        base_url = %attempt.base_url,
                        duration_ms,
                        "Attempt succeeded"
                    );
                    return DispatchOutcome {
                        operation,
                        result: Ok(DispatchSuccess {
                            payload,
                            provider: attempt.provider,
                            model: attempt.model.clone(),
                            base_url: attempt.base_url.clone(),
                        }),
                        attempts: records,
                    };
                }
                Err(failure) => {
                    tracing::warn!(
                        provider = %attempt.provider,
                        model = %attempt.model,
                        base_url = %attempt.base_url,
                        status = ?failure.status,
                        code = failure.error.error_code(),
                        error = %failure.error,
                        duration_ms,
                        "Attempt failed"
                    );
                    if failure.status == Some(429) {
                        abandoned.insert(pair);
                    }
                    last_error = failure.error.to_string();
                    records.push(record(
                        attempt,
                        AttemptOutcome::Failure,
                        failure.status,
                        Some(last_error.clone()),
                        duration_ms,
                    ));
                }
            }
        }

        let error = NewsroomError::AllAttemptsFailed {
            attempts: records.len(),
            last_error,
        };
        DispatchOutcome::failure(operation, error, records)
    }

    /// Drop attempts whose target fails the guard, checking each distinct
    /// (base URL, provider) pair once.
    fn authorized(&self, attempts: Vec<Attempt>, rejected: &mut Option<String>) -> Vec<Attempt> {
        let mut verdicts: HashMap<(String, Provider), bool> = HashMap::new();
        attempts
            .into_iter()
            .filter(|attempt| {
                let allowed = *verdicts
                    .entry((attempt.base_url.clone(), attempt.provider))
                    .or_insert_with(|| {
                        self.guard
                            .is_authorized_endpoint(&attempt.base_url, attempt.provider)
                    });
                if !allowed && rejected.is_none() {
                    *rejected = Some(attempt.base_url.clone());
                }
                allowed
            })
            .collect()
    }

    async fn execute(
        &self,
        operation: Operation,
        attempt: &Attempt,
        body: &Value,
    ) -> std::result::Result<Value, AttemptFailure> {
        let request = if attempt.provider.is_gemini_class() {
            let url = format!(
                "{}/models/{}:generateContent",
                attempt.base_url.trim_end_matches('/'),
                attempt.model
            );
            let payload = match operation {
                Operation::Generate => body.clone(),
                Operation::Validate => validation_payload(),
            };
            self.client
                .post(url)
                .query(&[("key", attempt.key.as_str())])
                .json(&payload)
        } else {
            let mut payload = match operation {
                Operation::Generate => body.clone(),
                Operation::Validate => json!({
                    "messages": [{"role": "user", "content": "ping"}],
                    "max_tokens": 1,
                }),
            };
            if let Some(map) = payload.as_object_mut() {
                map.insert("model".to_string(), Value::String(attempt.model.clone()));
            }
            self.client
                .post(&attempt.base_url)
                .bearer_auth(&attempt.key)
                .json(&payload)
        };

        // Gemini keys travel in the query string; keep URLs out of error text.
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            AttemptFailure::transport(if e.is_timeout() {
                NewsroomError::Timeout(self.attempt_timeout)
            } else {
                NewsroomError::Network(e.to_string())
            })
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AttemptFailure::transport(NewsroomError::Network(e.without_url().to_string())))?;

        if !status.is_success() {
            return Err(AttemptFailure::rejected(attempt.provider, status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| AttemptFailure::transport(NewsroomError::ParseResponse(e.to_string())))
    }
}

/// Cheapest possible generateContent request.
fn validation_payload() -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": "ping"}]}],
        "generationConfig": {"maxOutputTokens": 1},
    })
}

fn record(
    attempt: &Attempt,
    outcome: AttemptOutcome,
    http_status: Option<u16>,
    error_detail: Option<String>,
    duration_ms: u64,
) -> AttemptRecord {
    AttemptRecord {
        provider: attempt.provider,
        model: attempt.model.clone(),
        base_url: attempt.base_url.clone(),
        key_fingerprint: key_fingerprint(&attempt.key),
        outcome,
        http_status,
        error_detail,
        duration_ms,
    }
}
