//! Outbound endpoint allow-list.
//!
//! Any URL that did not come from the provider registry must pass
//! [`EndpointGuard::is_authorized_endpoint`] before the router may send a
//! request to it. Checks are pure and never touch the network.

use std::collections::HashSet;

use url::Url;

use super::provider::ProviderConfig;
use crate::core::provider::Provider;
use crate::error::{NewsroomError, Result};

/// Hosts of known provider APIs.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "generativelanguage.googleapis.com",
    "api.openai.com",
    "api.moonshot.ai",
    "api.moonshot.cn",
    "api.z.ai",
    "open.bigmodel.cn",
    "api.aimlapi.com",
    "api.deepseek.com",
    "openrouter.ai",
    "api.groq.com",
    "api.mistral.ai",
    "api.together.xyz",
];

/// Exact-host allow-list for outbound requests.
#[derive(Debug, Clone)]
pub struct EndpointGuard {
    allowed_hosts: HashSet<String>,
}

impl EndpointGuard {
    /// Guard over the built-in provider hosts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|h| (*h).to_string())
                .collect(),
        }
    }

    /// Add operator-configured hosts.
    #[must_use]
    pub fn with_extra_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for host in hosts {
            let host = host.as_ref().trim().to_lowercase();
            if !host.is_empty() {
                self.allowed_hosts.insert(host);
            }
        }
        self
    }

    /// Whether `target` is an http(s) URL whose host is exactly on the allow-list.
    ///
    /// URLs with embedded credentials are always rejected.
    #[must_use]
    pub fn is_authorized_endpoint(&self, target: &str, provider: Provider) -> bool {
        let Ok(url) = Url::parse(target.trim()) else {
            tracing::warn!(provider = %provider, "Rejected unparseable endpoint");
            return false;
        };

        if !matches!(url.scheme(), "http" | "https") {
            tracing::warn!(provider = %provider, scheme = url.scheme(), "Rejected endpoint scheme");
            return false;
        }

        if !url.username().is_empty() || url.password().is_some() {
            tracing::warn!(provider = %provider, "Rejected endpoint with credentials");
            return false;
        }

        let allowed = url
            .host_str()
            .is_some_and(|host| self.allowed_hosts.contains(&host.to_lowercase()));
        if !allowed {
            tracing::warn!(
                provider = %provider,
                host = url.host_str().unwrap_or_default(),
                "Rejected endpoint host not on allow-list"
            );
        }
        allowed
    }

    /// Pick the endpoint to use for a provider.
    ///
    /// Fixed registry endpoints always win and the override is ignored. The
    /// override is consulted only for providers without a fixed endpoint, and
    /// only when it passes the allow-list.
    pub fn resolve_endpoint(
        &self,
        config: &ProviderConfig,
        endpoint_override: Option<&str>,
    ) -> Result<String> {
        if let Some(fixed) = config.fixed_endpoint {
            if endpoint_override.is_some() {
                tracing::debug!(provider = %config.id, "Ignoring endpoint override for fixed provider");
            }
            return Ok(fixed.to_string());
        }

        match endpoint_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(target) if self.is_authorized_endpoint(target, config.id) => Ok(target.to_string()),
            Some(target) => Err(NewsroomError::UnauthorizedEndpoint {
                endpoint: target.to_string(),
            }),
            None => Err(NewsroomError::EndpointUnresolvable {
                provider: config.id.cli_name().to_string(),
            }),
        }
    }
}

impl Default for EndpointGuard {
    fn default() -> Self {
        Self::new()
    }
}
