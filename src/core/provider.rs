//! Provider descriptors, registry and secrets.
//!
//! Every upstream LLM service the router can reach is a variant of the closed
//! [`Provider`] enumeration. Its static configuration (endpoint, key aliases,
//! default model) lives in [`ProviderRegistry`]; keys come from the process
//! environment through [`Secrets`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{NewsroomError, Result};

// =============================================================================
// Provider Enum
// =============================================================================

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    Kimi,
    Zai,
    AiMl,
    DeepSeek,
    Custom,
}

impl Provider {
    /// All providers in display order.
    pub const ALL: &'static [Self] = &[
        Self::Gemini,
        Self::OpenAi,
        Self::Kimi,
        Self::Zai,
        Self::AiMl,
        Self::DeepSeek,
        Self::Custom,
    ];

    /// Default research rotation order.
    pub const RESEARCH_ROTATION: &'static [Self] = &[Self::Kimi, Self::Zai, Self::AiMl, Self::Gemini];

    /// Wire/CLI name for this provider.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Kimi => "kimi",
            Self::Zai => "zai",
            Self::AiMl => "aiml",
            Self::DeepSeek => "deepseek",
            Self::Custom => "custom",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
            Self::Kimi => "Kimi",
            Self::Zai => "z.ai",
            Self::AiMl => "AI/ML API",
            Self::DeepSeek => "DeepSeek",
            Self::Custom => "Custom",
        }
    }

    /// Parse from a wire or CLI name. Accepts a few common aliases.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        let alias = match lower.as_str() {
            "google" => "gemini",
            "moonshot" => "kimi",
            "zhipu" | "glm" => "zai",
            "ml" | "aimlapi" => "aiml",
            other => other,
        };
        Self::ALL
            .iter()
            .find(|p| p.cli_name() == alias)
            .copied()
            .ok_or_else(|| NewsroomError::InvalidProvider(name.to_string()))
    }

    /// Whether this is the privileged provider used as the research fallback.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Gemini)
    }

    /// Whether requests use the Gemini `generateContent` wire format.
    #[must_use]
    pub const fn is_gemini_class(self) -> bool {
        matches!(self, Self::Gemini)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cli_name())
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Static configuration for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: Provider,
    pub display_name: &'static str,
    /// Fixed endpoint. `None` means the endpoint must come from an allow-listed override.
    pub fixed_endpoint: Option<&'static str>,
    /// Environment variable aliases for the key, tried in order.
    pub key_env_names: &'static [&'static str],
    pub default_model: &'static str,
}

/// Stable base URL for the Gemini API.
pub const GEMINI_STABLE_BASE: &str = "https://generativelanguage.googleapis.com/v1";
/// Beta base URL for the Gemini API.
pub const GEMINI_BETA_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Registry of all provider configurations.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    configs: HashMap<Provider, ProviderConfig>,
}

impl ProviderRegistry {
    /// Create the registry with every provider.
    #[must_use]
    pub fn new() -> Self {
        let configs = Provider::ALL
            .iter()
            .map(|&provider| (provider, Self::builtin(provider)))
            .collect();
        Self { configs }
    }

    const fn builtin(provider: Provider) -> ProviderConfig {
        let (fixed_endpoint, key_env_names, default_model): (
            Option<&'static str>,
            &'static [&'static str],
            &'static str,
        ) = match provider {
            Provider::Gemini => (
                Some(GEMINI_BETA_BASE),
                &[
                    "GEMINI_API_KEY",
                    "GOOGLE_API_KEY",
                    "GEMINI_API_KEY_SECONDARY",
                    "GEMINI_API_KEY_FALLBACK",
                ],
                "gemini-2.5-flash",
            ),
            Provider::OpenAi => (
                Some("https://api.openai.com/v1/chat/completions"),
                &["OPENAI_API_KEY"],
                "gpt-4o-mini",
            ),
            Provider::Kimi => (
                Some("https://api.moonshot.ai/v1/chat/completions"),
                &["KIMI_API_KEY", "MOONSHOT_API_KEY"],
                "moonshot-v1-8k",
            ),
            Provider::Zai => (
                Some("https://api.z.ai/api/paas/v4/chat/completions"),
                &["ZAI_API_KEY", "ZHIPU_API_KEY"],
                "glm-4.5",
            ),
            Provider::AiMl => (
                Some("https://api.aimlapi.com/v1/chat/completions"),
                &["AIML_API_KEY", "ML_API_KEY"],
                "gpt-4o",
            ),
            Provider::DeepSeek => (
                Some("https://api.deepseek.com/chat/completions"),
                &["DEEPSEEK_API_KEY"],
                "deepseek-chat",
            ),
            Provider::Custom => (None, &["CUSTOM_LLM_API_KEY"], "gpt-4o-mini"),
        };

        ProviderConfig {
            id: provider,
            display_name: provider.display_name(),
            fixed_endpoint,
            key_env_names,
            default_model,
        }
    }

    /// Get configuration for a provider.
    #[must_use]
    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        // Populated from Provider::ALL in new(), so every variant is present.
        self.configs
            .get(&provider)
            .unwrap_or_else(|| unreachable!("provider {provider} missing from registry"))
    }

    /// Iterate all configurations.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.configs.values()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Provider keys captured from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Secrets").field("names", &names).finish()
    }
}

impl Secrets {
    /// Read every known key alias from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let values = Provider::ALL
            .iter()
            .flat_map(|p| ProviderRegistry::builtin(*p).key_env_names.iter())
            .filter_map(|name| std::env::var(name).ok().map(|v| ((*name).to_string(), v)))
            .collect();
        Self { values }
    }

    /// Build from explicit name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Every non-empty key for a provider, in alias order, deduplicated by value.
    #[must_use]
    pub fn keys_for(&self, config: &ProviderConfig) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for name in config.key_env_names {
            if let Some(value) = self.values.get(*name) {
                let value = value.trim();
                if !value.is_empty() && !keys.iter().any(|k| k == value) {
                    keys.push(value.to_string());
                }
            }
        }
        keys
    }

    /// First non-empty key for a provider.
    #[must_use]
    pub fn first_key(&self, config: &ProviderConfig) -> Option<String> {
        self.keys_for(config).into_iter().next()
    }
}

/// Short, non-reversible identifier for a key, safe for logs and diagnostics.
#[must_use]
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("sha256:{}", hex::encode(&digest[..4]))
}
