//! Logging behaviour: subscriber initialization and key hygiene.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::{MockServer, ResponseTemplate};

use newsroom::core::logging::{self, LogFormat, LogLevel, LogSettings};

use common::log_capture::LogCapture;
use common::upstream::{UpstreamGateway, mount_generate};

fn settings(level: LogLevel, format: LogFormat) -> LogSettings {
    LogSettings {
        level,
        format,
        file: None,
    }
}

#[test]
fn test_log_format_human() {
    logging::init(&settings(LogLevel::Debug, LogFormat::Human));
}

#[test]
fn test_log_format_json() {
    logging::init(&settings(LogLevel::Debug, LogFormat::Json));
}

#[test]
fn test_log_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("newsroom.log");
    logging::init(&LogSettings {
        file: Some(path.clone()),
        ..settings(LogLevel::Info, LogFormat::Compact)
    });
    assert!(path.exists());
}

#[test]
fn test_unopenable_log_file_does_not_panic() {
    let dir = tempfile::tempdir().unwrap();
    logging::init(&LogSettings {
        file: Some(dir.path().join("missing").join("newsroom.log")),
        ..settings(LogLevel::Info, LogFormat::Human)
    });
}

#[tokio::test]
async fn provider_keys_never_reach_logs_or_attempts() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        "v1",
        "m1",
        "super-secret-key",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount_generate(
        &server,
        "v1beta",
        "m1",
        "super-secret-key",
        ResponseTemplate::new(401).set_body_string("bad key"),
        1,
    )
    .await;

    let capture = LogCapture::start();
    let gateway = UpstreamGateway::new(&server)
        .key("GEMINI_API_KEY", "super-secret-key")
        .timeout(Duration::from_millis(300))
        .build();
    let outcome = gateway.generate(None, Vec::new(), &json!({"contents": []})).await;

    assert!(!outcome.is_success());
    let trail = serde_json::to_string(&outcome.attempts).unwrap();
    assert!(!trail.contains("super-secret-key"));
    assert!(!outcome.result.unwrap_err().to_string().contains("super-secret-key"));
    capture.assert_never_logged("super-secret-key");
    assert_eq!(capture.named("Attempt failed").len(), 2);
}
