//! Generate command: one ad-hoc Gemini call.

use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::args::GenerateArgs;
use crate::cli::{AppContext, Output};
use crate::core::dispatcher::AttemptRecord;
use crate::core::normalize::extract_text;
use crate::error::Result;
use crate::render::human::render_attempts;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateOutput<'a> {
    text: &'a str,
    model: &'a str,
    base_url: &'a str,
    attempts: &'a [AttemptRecord],
}

/// Request body for a plain prompt.
#[must_use]
pub fn prompt_body(prompt: &str, search: bool) -> Value {
    let mut body = json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
    });
    if search {
        body["tools"] = json!([{"google_search": {}}]);
    }
    body
}

/// Execute the generate command.
///
/// # Errors
///
/// Returns the routing error if every attempt failed.
pub async fn execute(ctx: &AppContext, args: &GenerateArgs, output: Output) -> Result<()> {
    let gateway = ctx.gateway()?;
    let outcome = gateway
        .generate(None, args.models.clone(), &prompt_body(&args.prompt, args.search))
        .await;

    let success = match outcome.result {
        Ok(success) => success,
        Err(error) => {
            if output.format == crate::cli::OutputFormat::Human {
                eprint!("{}", render_attempts(&outcome.attempts));
            }
            return Err(error);
        }
    };

    let text = extract_text(&success.payload);
    let result = GenerateOutput {
        text: &text,
        model: &success.model,
        base_url: &success.base_url,
        attempts: &outcome.attempts,
    };
    output.emit(&result, || format!("{}\n", text.trim_end()))
}
