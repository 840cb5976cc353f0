//! Validate command: check Gemini keys and models and show every attempt.

use std::time::Instant;

use serde::Serialize;

use crate::cli::args::ValidateArgs;
use crate::cli::{AppContext, Output};
use crate::core::dispatcher::AttemptRecord;
use crate::core::gateway::GeminiCallRequest;
use crate::core::resolver::Operation;
use crate::error::{NewsroomError, Result};
use crate::render::human::render_attempts;

/// Result of a validation run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<AttemptRecord>,
    pub duration_ms: u64,
}

/// Execute the validate command.
///
/// # Errors
///
/// Returns the routing error when no attempt succeeded, after printing the
/// trail.
pub async fn execute(ctx: &AppContext, args: &ValidateArgs, output: Output) -> Result<()> {
    let start = Instant::now();
    tracing::debug!(models = ?args.models, caller_key = args.api_key.is_some(), "Starting validation");

    let gateway = ctx.gateway()?;
    let response = gateway
        .gemini(GeminiCallRequest {
            operation: Operation::Validate,
            api_key: args.api_key.clone(),
            model_candidates: args.models.clone(),
            body: None,
        })
        .await;

    let report = ValidationReport {
        ok: response.ok(),
        error: response
            .body
            .get("error")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        attempts: response.attempts(),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    output.emit(&report, || {
        let verdict = if report.ok { "Gemini access OK" } else { "Gemini access FAILED" };
        format!("{verdict}\n{}", render_attempts(&report.attempts))
    })?;

    if report.ok {
        Ok(())
    } else {
        Err(failure_from_status(response.status, report))
    }
}

fn failure_from_status(status: u16, report: ValidationReport) -> NewsroomError {
    let message = report.error.unwrap_or_else(|| "validation failed".to_string());
    match status {
        400 => NewsroomError::NoKeysConfigured {
            provider: "gemini".to_string(),
        },
        403 => NewsroomError::UnauthorizedEndpoint { endpoint: message },
        _ => NewsroomError::AllAttemptsFailed {
            attempts: report.attempts.len(),
            last_error: message,
        },
    }
}
