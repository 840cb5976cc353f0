//! Error rendering for the CLI.
//!
//! Human mode prints a one-line message with the error code and, where one
//! exists, a fix hint. JSON mode prints a structured object for scripts.

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::NewsroomError;

/// Render an error for the given output format.
#[must_use]
pub fn render_error(error: &NewsroomError, format: OutputFormat, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_simple(error),
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &NewsroomError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

fn render_simple(error: &NewsroomError) -> String {
    let mut lines = vec![format!("Error [{}]: {}", error.error_code(), error)];
    if let Some(hint) = fix_hint(error) {
        lines.push(format!("Fix: {hint}"));
    }
    lines.join("\n")
}

/// Short remediation for errors an operator can fix.
fn fix_hint(error: &NewsroomError) -> Option<String> {
    match error {
        NewsroomError::NoKeysConfigured { provider } if provider == "gemini" => {
            Some("export GEMINI_API_KEY=<key>".to_string())
        }
        NewsroomError::NoKeysConfigured { provider } => Some(format!(
            "export the API key variable for {provider} (see `newsroom validate --help`)"
        )),
        NewsroomError::UnauthorizedEndpoint { .. } => Some(
            "use a provider's official host, or add it to [security] extra_allowed_hosts".to_string(),
        ),
        NewsroomError::EndpointUnresolvable { .. } => {
            Some("pass --endpoint with an allow-listed URL".to_string())
        }
        NewsroomError::AllAttemptsFailed { .. } => {
            Some("run `newsroom validate` to see every attempt".to_string())
        }
        NewsroomError::AgentNotFound(_) => Some("run `newsroom agents list`".to_string()),
        NewsroomError::Config(_) => Some(format!(
            "check {}",
            crate::storage::config::Config::config_path().display()
        )),
        _ => None,
    }
}

/// JSON representation of an error.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &NewsroomError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            hint: fix_hint(error),
        }
    }
}
