#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsroom::core::dispatcher::Dispatcher;
use newsroom::core::gateway::Gateway;
use newsroom::core::guard::EndpointGuard;
use newsroom::core::http::build_client;
use newsroom::core::provider::{ProviderRegistry, Secrets};
use newsroom::core::resolver::Resolver;

/// Host the mock server binds to.
pub const MOCK_HOST: &str = "127.0.0.1";

/// Stable and beta Gemini bases on the mock server.
pub fn gemini_bases(server: &MockServer) -> Vec<String> {
    vec![format!("{}/v1", server.uri()), format!("{}/v1beta", server.uri())]
}

/// Path of a generateContent call for `version` ("v1" or "v1beta") and `model`.
pub fn generate_path(version: &str, model: &str) -> String {
    format!("/{version}/models/{model}:generateContent")
}

/// Builder for a gateway pointed at a mock server.
pub struct UpstreamGateway<'a> {
    server: &'a MockServer,
    keys: Vec<(String, String)>,
    models: Vec<String>,
    timeout: Duration,
    allow_mock_host: bool,
}

impl<'a> UpstreamGateway<'a> {
    pub fn new(server: &'a MockServer) -> Self {
        Self {
            server,
            keys: Vec::new(),
            models: vec!["m1".to_string()],
            timeout: Duration::from_secs(5),
            allow_mock_host: true,
        }
    }

    pub fn key(mut self, name: &str, value: &str) -> Self {
        self.keys.push((name.to_string(), value.to_string()));
        self
    }

    pub fn models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(ToString::to_string).collect();
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Leave the mock host off the allow-list.
    pub const fn without_allow_listing(mut self) -> Self {
        self.allow_mock_host = false;
        self
    }

    pub fn build(self) -> Gateway {
        let mut guard = EndpointGuard::new();
        if self.allow_mock_host {
            guard = guard.with_extra_hosts([MOCK_HOST]);
        }
        let client = build_client(self.timeout).expect("client builds");
        let dispatcher = Dispatcher::new(client, guard.clone(), self.timeout);
        let resolver = Resolver::new(ProviderRegistry::new(), Secrets::from_pairs(self.keys))
            .with_gemini_base_urls(gemini_bases(self.server))
            .with_gemini_models(self.models);
        Gateway::new(resolver, dispatcher, guard)
    }
}

/// Mount a generateContent responder for one (version, model, key).
pub async fn mount_generate(
    server: &MockServer,
    version: &str,
    model: &str,
    key: &str,
    response: ResponseTemplate,
    expected_calls: u64,
) {
    Mock::given(method("POST"))
        .and(path(generate_path(version, model)))
        .and(query_param("key", key))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// 200 response carrying `body`.
pub fn ok_json(body: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
