//! Human-readable plain text output.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::agents::model::AgentDefinition;
use crate::agents::pipeline::{Progress, RunReport};
use crate::agents::scheduler::is_due;
use crate::core::dispatcher::{AttemptOutcome, AttemptRecord};
use crate::core::research::ResearchItem;
use crate::util::format::{format_duration_ms, truncate};
use crate::util::time::{format_countdown, format_relative_time};

/// Numbered attempt trail, one line per attempt plus an indented detail line
/// for failures.
#[must_use]
pub fn render_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "No attempts were made.\n".to_string();
    }

    let mut out = String::new();
    for (i, attempt) in attempts.iter().enumerate() {
        let verdict = match (attempt.outcome, attempt.http_status) {
            (AttemptOutcome::Success, _) => "ok".to_string(),
            (AttemptOutcome::Failure, Some(status)) => format!("HTTP {status}"),
            (AttemptOutcome::Failure, None) => "failed".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>3}. {:<8} {:<24} {:<10} {} [{}] {}",
            i + 1,
            attempt.provider.cli_name(),
            attempt.model,
            verdict,
            attempt.base_url,
            attempt.key_fingerprint,
            format_duration_ms(attempt.duration_ms),
        );
        if let Some(detail) = &attempt.error_detail {
            let _ = writeln!(out, "       {}", truncate(detail.trim(), 160));
        }
    }
    out
}

/// Agent table with schedule state.
#[must_use]
pub fn render_agents(agents: &[AgentDefinition], now: DateTime<Utc>) -> String {
    if agents.is_empty() {
        return "No agents configured. Add one with `newsroom agents add`.\n".to_string();
    }

    let mut out = String::new();
    for agent in agents {
        let state = if !agent.is_active() {
            agent.status.as_str().to_string()
        } else if is_due(agent, now) {
            "due".to_string()
        } else {
            agent.last_run_at.map_or_else(
                || "due".to_string(),
                |last| format!("next {}", format_countdown(last + agent.interval(), now)),
            )
        };
        let last = agent
            .last_run_at
            .map_or_else(|| "never".to_string(), |last| format_relative_time(last, now));
        let _ = writeln!(
            out,
            "{}  {}  [{}] {} / {}  schedule={} perspective={}  last run {}  ({})",
            agent.id,
            agent.name,
            agent.category,
            agent.niche,
            agent.perspective_label(),
            agent.schedule,
            agent.perspective,
            last,
            state,
        );
    }
    out
}

/// Research findings, numbered.
#[must_use]
pub fn render_research(items: &[ResearchItem]) -> String {
    if items.is_empty() {
        return "No research results.\n".to_string();
    }

    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item.title);
        if !item.summary.is_empty() {
            let _ = writeln!(out, "   {}", item.summary);
        }
        if !item.source.is_empty() {
            let _ = writeln!(out, "   {}", item.source);
        }
    }
    out
}

/// Summary of a finished agent run.
#[must_use]
pub fn render_report(report: &RunReport) -> String {
    let mut out = format!(
        "Published \"{}\" by {}\n  article {}  slug {}\n",
        report.title, report.agent_name, report.article_id, report.slug
    );
    match &report.image_error {
        None => out.push_str("  featured image attached\n"),
        Some(error) => {
            let _ = writeln!(out, "  no featured image ({})", truncate(error, 120));
        }
    }
    out
}

/// One progress line.
#[must_use]
pub fn render_progress(progress: &Progress) -> String {
    format!("[{:>3}%] {}", progress.percent, progress.message)
}
