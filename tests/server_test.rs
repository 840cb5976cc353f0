//! End-to-end tests of the HTTP server over a real socket.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsroom::agents::AgentRunner;
use newsroom::server::{AppState, spawn};
use newsroom::test_utils::{FakeGenerator, make_gemini_text_payload, make_test_agent, seeded_store};

use common::upstream::{UpstreamGateway, mount_generate, ok_json};

struct TestServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(upstream: &MockServer, agents: usize) -> Self {
        let gateway = Arc::new(UpstreamGateway::new(upstream).key("GEMINI_API_KEY", "k1").build());
        let seeds: Vec<_> = (0..agents).map(|i| make_test_agent(&format!("Agent {i}"))).collect();
        let (store, _) = seeded_store(&seeds);
        let runner = AgentRunner::new(Arc::new(FakeGenerator::new()), store);
        let (addr, handle) = spawn(
            AppState::new(gateway, runner),
            "127.0.0.1:0".parse().unwrap(),
        )
        .await
        .expect("server binds");
        Self {
            addr,
            handle,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("request sent");
        let status = response.status().as_u16();
        (status, response.json().await.expect("JSON body"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_version_with_cors() {
    let upstream = MockServer::start().await;
    let server = TestServer::start(&upstream, 0).await;

    let response = server
        .client
        .get(server.url("/api/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"].to_str().unwrap(),
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn preflight_is_answered_without_a_body() {
    let upstream = MockServer::start().await;
    let server = TestServer::start(&upstream, 0).await;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/gemini"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert!(
        response.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .contains("content-type")
    );
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn gemini_route_forwards_generate_calls() {
    let upstream = MockServer::start().await;
    mount_generate(
        &upstream,
        "v1",
        "m1",
        "k1",
        ok_json(&make_gemini_text_payload("served")),
        1,
    )
    .await;
    let server = TestServer::start(&upstream, 0).await;

    let (status, body) = server
        .post(
            "/api/gemini",
            &json!({"operation": "generate", "body": {"contents": []}}),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["model"], "m1");
}

#[tokio::test]
async fn proxy_research_rejects_private_endpoints() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let server = TestServer::start(&upstream, 0).await;

    let (status, body) = server
        .post(
            "/api/proxy-research",
            &json!({
                "provider": "custom",
                "query": "q",
                "endpoint": "http://169.254.169.254/latest/meta-data"
            }),
        )
        .await;

    assert_eq!(status, 403);
    assert_eq!(body, json!({"error": "Unauthorized endpoint provided"}));
}

#[tokio::test]
async fn research_route_returns_items_from_fallback() {
    let upstream = MockServer::start().await;
    let items = json!([{"title": "Found", "summary": "s", "source": "https://a.example"}]);
    mount_generate(
        &upstream,
        "v1",
        "m1",
        "k1",
        ok_json(&make_gemini_text_payload(&items.to_string())),
        1,
    )
    .await;
    let server = TestServer::start(&upstream, 0).await;

    let (status, body) = server.post("/api/research", &json!({"query": "chips"})).await;

    assert_eq!(status, 200);
    assert_eq!(body["items"][0]["title"], "Found");
}

#[tokio::test]
async fn deploy_route_publishes_then_reports_idle() {
    let upstream = MockServer::start().await;
    let server = TestServer::start(&upstream, 1).await;

    let (status, body) = server.post("/api/agents/deploy", &json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["report"]["agentName"], "Agent 0");
    assert_eq!(body["report"]["hasImage"], true);

    let (status, body) = server.post("/api/agents/deploy", &json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["report"], Value::Null);
}

#[tokio::test]
async fn deploy_route_unknown_agent_is_404() {
    let upstream = MockServer::start().await;
    let server = TestServer::start(&upstream, 1).await;

    let (status, body) = server
        .post("/api/agents/deploy", &json!({"agentId": "missing"}))
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let upstream = MockServer::start().await;
    let server = TestServer::start(&upstream, 0).await;

    let (status, body) = server.post("/api/nope", &json!({})).await;

    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("/api/nope"));
}
