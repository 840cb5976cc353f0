//! Deploy command: one scheduler pass.

use chrono::Utc;
use serde_json::json;

use crate::agents::pipeline::{AgentRunner, Progress, ProgressObserver, RunReport};
use crate::cli::args::DeployArgs;
use crate::cli::{AppContext, Output, OutputFormat};
use crate::error::Result;
use crate::render::human::{render_progress, render_report};

/// Execute the deploy command.
///
/// # Errors
///
/// Returns the pipeline error if the selected agent's run failed.
pub async fn execute(ctx: &AppContext, args: &DeployArgs, output: Output) -> Result<()> {
    let runner = ctx.runner(ctx.gateway()?, ctx.store()?);
    let report = run_pass(&runner, args.agent.as_deref(), output).await?;
    emit_report(report.as_ref(), output)
}

/// Run one pass, printing progress to stderr in human mode.
///
/// # Errors
///
/// Returns the pipeline error of the selected agent.
pub async fn run_pass(
    runner: &AgentRunner,
    forced: Option<&str>,
    output: Output,
) -> Result<Option<RunReport>> {
    let print_progress = |progress: &Progress| eprintln!("{}", render_progress(progress));
    let observer: Option<ProgressObserver<'_>> = if output.format == OutputFormat::Human {
        Some(&print_progress)
    } else {
        None
    };
    runner.deploy(forced, Utc::now(), observer).await
}

/// Print the outcome of a pass.
///
/// # Errors
///
/// Returns a JSON error if serialization fails.
pub fn emit_report(report: Option<&RunReport>, output: Output) -> Result<()> {
    output.emit(&json!({"report": report}), || {
        report.map_or_else(|| "No agent due.\n".to_string(), render_report)
    })
}
