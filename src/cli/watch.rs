//! Watch mode: run scheduler passes on an interval until Ctrl-C.

use chrono::{DateTime, Utc};
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::agents::pipeline::RunReport;
use crate::cli::args::WatchArgs;
use crate::cli::deploy::{emit_report, run_pass};
use crate::cli::{AppContext, Output};
use crate::error::{NewsroomError, Result};
use crate::storage::config::MAX_INTERVAL_MINUTES;

/// State tracked across scheduler passes.
#[derive(Debug, Default)]
pub struct WatchState {
    pub passes: u64,
    pub published: u64,
    pub idle_passes: u64,
    pub error_count: u64,
    pub last_pass_at: Option<DateTime<Utc>>,
    pub last_report: Option<RunReport>,
    pub last_error: Option<NewsroomError>,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one pass.
    pub(crate) fn update(&mut self, result: Result<Option<RunReport>>, at: DateTime<Utc>) {
        self.passes += 1;
        self.last_pass_at = Some(at);
        match result {
            Ok(Some(report)) => {
                self.published += 1;
                self.last_report = Some(report);
                self.last_error = None;
            }
            Ok(None) => {
                self.idle_passes += 1;
                self.last_error = None;
            }
            Err(error) => {
                self.error_count += 1;
                self.last_error = Some(error);
                // Keep last_report for the summary.
            }
        }
    }
}

/// Period between scheduler passes for an interval in minutes.
///
/// # Errors
///
/// Returns a configuration error for zero or more than
/// [`MAX_INTERVAL_MINUTES`].
pub fn pass_interval(minutes: u64) -> Result<Duration> {
    if !(1..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        return Err(NewsroomError::Config(format!(
            "Watch interval must be between 1 and {MAX_INTERVAL_MINUTES} minutes"
        )));
    }
    Ok(Duration::from_secs(minutes * 60))
}

/// Run the scheduler loop.
///
/// Pass failures are logged and the loop continues; a failed agent stays
/// due and is retried on a later pass.
///
/// # Errors
///
/// Returns an error if the gateway or store cannot be set up, or if the
/// configured interval is out of range.
pub async fn execute(ctx: &AppContext, args: &WatchArgs, output: Output) -> Result<()> {
    let minutes = args
        .interval_minutes
        .unwrap_or(ctx.resolved.config.scheduler.interval_minutes);
    let period = pass_interval(minutes)?;

    let runner = ctx.runner(ctx.gateway()?, ctx.store()?);
    let mut state = WatchState::new();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    tracing::info!(interval_minutes = minutes, "Scheduler watch started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = run_pass(&runner, None, output).await;
                if let Ok(report) = &result {
                    emit_report(report.as_ref(), output)?;
                }
                if let Err(error) = &result {
                    tracing::error!(error = %error, "Scheduler pass failed");
                }
                state.update(result, Utc::now());
            }
            _ = &mut shutdown_rx => {
                tracing::info!(
                    passes = state.passes,
                    published = state.published,
                    errors = state.error_count,
                    "Scheduler watch stopped"
                );
                break;
            }
        }
    }

    Ok(())
}
