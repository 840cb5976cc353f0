//! Attempt resolution.
//!
//! Expands one logical operation into the ordered list of concrete
//! (key, model, base URL) attempts the dispatcher will try. Resolution is
//! infallible: missing configuration yields an empty list.

use serde::{Deserialize, Serialize};

use super::provider::{
    GEMINI_BETA_BASE, GEMINI_STABLE_BASE, Provider, ProviderRegistry, Secrets, key_fingerprint,
};

/// Model candidates tried for Gemini when the caller does not supply any.
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash"];

/// Logical operation routed through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Generate,
    Validate,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Validate => "validate",
        }
    }
}

/// One concrete combination to try.
#[derive(Clone, PartialEq, Eq)]
pub struct Attempt {
    pub provider: Provider,
    pub key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attempt")
            .field("provider", &self.provider)
            .field("key", &key_fingerprint(&self.key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Input to [`Resolver::resolve_attempts`].
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub operation: Operation,
    pub provider: Option<Provider>,
    pub caller_key: Option<String>,
    pub model_candidates: Vec<String>,
    /// Only consulted for providers without a fixed endpoint.
    pub endpoint_override: Option<String>,
}

impl ResolveRequest {
    #[must_use]
    pub fn gemini(operation: Operation) -> Self {
        Self {
            operation,
            provider: Some(Provider::Gemini),
            ..Self::default()
        }
    }
}

/// Produces attempt lists from the registry and the configured secrets.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: ProviderRegistry,
    secrets: Secrets,
    gemini_base_urls: Vec<String>,
    gemini_models: Vec<String>,
}

impl Resolver {
    #[must_use]
    pub fn new(registry: ProviderRegistry, secrets: Secrets) -> Self {
        Self {
            registry,
            secrets,
            gemini_base_urls: vec![GEMINI_STABLE_BASE.to_string(), GEMINI_BETA_BASE.to_string()],
            gemini_models: DEFAULT_GEMINI_MODELS.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    /// Replace the Gemini base URL candidates (ignored when empty).
    #[must_use]
    pub fn with_gemini_base_urls(mut self, base_urls: Vec<String>) -> Self {
        if !base_urls.is_empty() {
            self.gemini_base_urls = base_urls;
        }
        self
    }

    /// Replace the default Gemini model candidates (ignored when empty).
    #[must_use]
    pub fn with_gemini_models(mut self, models: Vec<String>) -> Self {
        if !models.is_empty() {
            self.gemini_models = models;
        }
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    /// Whether any server-side key exists for `provider`.
    #[must_use]
    pub fn has_server_key(&self, provider: Provider) -> bool {
        self.secrets.first_key(self.registry.get(provider)).is_some()
    }

    /// Expand a request into ordered attempts.
    ///
    /// Gemini generate: key (outer) then model then base URL (inner).
    /// Gemini validate: one key, then model then base URL.
    /// Any other provider: exactly one attempt.
    #[must_use]
    pub fn resolve_attempts(&self, request: &ResolveRequest) -> Vec<Attempt> {
        let provider = request.provider.unwrap_or(Provider::Gemini);
        let attempts = if provider.is_gemini_class() {
            self.resolve_gemini(request)
        } else {
            self.resolve_single(provider, request)
        };

        tracing::debug!(
            provider = %provider,
            operation = request.operation.as_str(),
            count = attempts.len(),
            "Resolved attempts"
        );
        attempts
    }

    fn resolve_gemini(&self, request: &ResolveRequest) -> Vec<Attempt> {
        let config = self.registry.get(Provider::Gemini);
        let caller = request
            .caller_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let mut keys: Vec<String> = Vec::new();
        if let Some(key) = caller {
            keys.push(key.to_string());
        }
        match request.operation {
            Operation::Generate => {
                for key in self.secrets.keys_for(config) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            Operation::Validate => {
                if keys.is_empty() {
                    keys.extend(self.secrets.first_key(config));
                }
            }
        }

        let mut models = trimmed(&request.model_candidates);
        if models.is_empty() {
            models = self.gemini_models.iter().map(String::as_str).collect();
        }

        let mut attempts = Vec::with_capacity(keys.len() * models.len() * self.gemini_base_urls.len());
        for key in &keys {
            for model in &models {
                for base_url in &self.gemini_base_urls {
                    attempts.push(Attempt {
                        provider: Provider::Gemini,
                        key: key.clone(),
                        model: (*model).to_string(),
                        base_url: base_url.clone(),
                    });
                }
            }
        }
        attempts
    }

    fn resolve_single(&self, provider: Provider, request: &ResolveRequest) -> Vec<Attempt> {
        let config = self.registry.get(provider);

        let Some(key) = self.secrets.first_key(config) else {
            return Vec::new();
        };

        let base_url = match (config.fixed_endpoint, request.endpoint_override.as_deref()) {
            (Some(fixed), _) => fixed.to_string(),
            (None, Some(target)) if !target.trim().is_empty() => target.trim().to_string(),
            (None, _) => return Vec::new(),
        };

        let model = trimmed(&request.model_candidates)
            .first()
            .copied()
            .unwrap_or(config.default_model)
            .to_string();

        vec![Attempt {
            provider,
            key,
            model,
            base_url,
        }]
    }
}

/// Trimmed, non-blank entries in order.
fn trimmed(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect()
}
