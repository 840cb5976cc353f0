//! End-to-end tests of the `newsroom` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use wiremock::MockServer;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use newsroom::test_utils::{TestDir, make_gemini_text_payload, make_test_config_toml};

const KEY_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "GEMINI_API_KEY_SECONDARY",
    "GEMINI_API_KEY_FALLBACK",
    "OPENAI_API_KEY",
    "KIMI_API_KEY",
    "MOONSHOT_API_KEY",
    "ZAI_API_KEY",
    "ZHIPU_API_KEY",
    "AIML_API_KEY",
    "ML_API_KEY",
    "DEEPSEEK_API_KEY",
    "CUSTOM_LLM_API_KEY",
    "NEWSROOM_VALIDATE_KEY",
    "NEWSROOM_LOG",
    "NEWSROOM_AUTHOR_ID",
    "NEWSROOM_TIMEOUT",
];

/// Command isolated to a temp config and database with no provider keys.
fn newsroom(dir: &TestDir) -> Command {
    if !dir.file_exists("config.toml") {
        dir.create_file("config.toml", &make_test_config_toml());
    }
    let mut cmd = Command::cargo_bin("newsroom").unwrap();
    for var in KEY_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NEWSROOM_CONFIG", dir.file_path("config.toml"))
        .env("NEWSROOM_DB", dir.file_path("newsroom.db"));
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn help_lists_commands() {
    let dir = TestDir::new();
    newsroom(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn agents_add_then_list_round_trips_through_sqlite() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args([
            "--json", "agents", "add", "--name", "Ada", "--category", "Tech", "--niche", "chips",
            "--schedule", "weekly", "--perspective", "-2",
        ])
        .assert()
        .success();

    let output = newsroom(&dir)
        .args(["--json", "agents", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let agents = stdout_json(&output);
    assert_eq!(agents.as_array().unwrap().len(), 1);
    assert_eq!(agents[0]["name"], "Ada");
    assert_eq!(agents[0]["schedule"], "weekly");
    assert_eq!(agents[0]["perspective"], -2);
    assert_eq!(agents[0]["status"], "active");
}

#[test]
fn agents_pause_unknown_id_fails() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args(["agents", "pause", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn agents_add_rejects_unknown_schedule() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args([
            "agents", "add", "--name", "Ada", "--category", "Tech", "--niche", "chips",
            "--schedule", "fortnightly",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown schedule"));
}

#[test]
fn validate_without_keys_exits_with_config_error() {
    let dir = TestDir::new();
    newsroom(&dir)
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn json_errors_are_machine_readable() {
    let dir = TestDir::new();
    let output = newsroom(&dir)
        .args(["--json", "validate"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .find(|l| l.trim_start().starts_with('{') && l.contains("errorCode"))
        .expect("JSON error on stderr");
    let error: Value = serde_json::from_str(line).unwrap();
    assert_eq!(error["category"], "Configuration error");
    assert_eq!(error["isRetryable"], false);
}

#[test]
fn deploy_with_no_agents_reports_nothing_due() {
    let dir = TestDir::new();
    newsroom(&dir)
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("No agent due"));
}

#[test]
fn deploy_without_keys_fails_and_leaves_agent_due() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args(["agents", "add", "--name", "Ada", "--category", "Tech", "--niche", "chips"])
        .assert()
        .success();

    newsroom(&dir).arg("deploy").assert().code(2);

    let output = newsroom(&dir)
        .args(["--json", "agents", "list"])
        .output()
        .unwrap();
    let agents = stdout_json(&output);
    assert_eq!(agents[0]["lastRunAt"], Value::Null);
}

#[test]
fn research_endpoint_requires_provider() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args(["research", "chips", "--endpoint", "https://api.openai.com/v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--provider"));
}

#[test]
fn research_rejects_disallowed_endpoint() {
    let dir = TestDir::new();
    newsroom(&dir)
        .env("CUSTOM_LLM_API_KEY", "k")
        .args([
            "research",
            "chips",
            "--provider",
            "custom",
            "--endpoint",
            "http://10.0.0.5/v1/chat/completions",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unauthorized endpoint provided"));
}

#[test]
fn watch_rejects_zero_interval() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args(["watch", "--interval-minutes", "0"])
        .assert()
        .code(2);
}

#[test]
fn watch_rejects_oversized_interval() {
    let dir = TestDir::new();
    newsroom(&dir)
        .args(["watch", "--interval-minutes", "18446744073709551615"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Watch interval"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generate_routes_through_configured_bases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(make_gemini_text_payload("From the wire")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.create_file(
        "config.toml",
        &format!(
            "{}\n[security]\nextra_allowed_hosts = [\"127.0.0.1\"]\n",
            make_test_config_toml().replace(
                "[gemini]\n",
                &format!("[gemini]\nbase_urls = [\"{}/v1\"]\n", server.uri()),
            )
        ),
    );

    let output = newsroom(&dir)
        .env("GEMINI_API_KEY", "cli-key")
        .args(["--json", "generate", "Say hi"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let body = stdout_json(&output);
    assert_eq!(body["text"], "From the wire");
    assert_eq!(body["model"], "gemini-2.5-flash");
}
