//! Background job scheduler
//!
//! A plain tokio interval loop. Each tick runs the recurrence engine, then
//! the monthly reports (gated to the first of the month internally), then
//! budget alerts. Job failures are logged and the loop keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use penny_core::{alerts, recurring, reports};

use crate::AppState;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        JobsConfig {
            interval: Duration::from_secs(60 * 60),
        }
    }
}

impl JobsConfig {
    /// Read `PENNY_JOBS_INTERVAL_HOURS`, defaulting to hourly.
    pub fn from_env() -> Self {
        let hours = std::env::var("PENNY_JOBS_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(1);
        JobsConfig {
            interval: Duration::from_secs(hours * 60 * 60),
        }
    }
}

/// Spawn the job loop. Runs until the process exits.
pub fn start(state: Arc<AppState>, config: JobsConfig) {
    info!(interval_secs = config.interval.as_secs(), "job scheduler started");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_once(&state).await;
        }
    });
}

/// One scheduler pass. Shared with nothing; admin triggers call the
/// underlying job functions directly with `force` semantics instead.
async fn run_once(state: &AppState) {
    let now = Utc::now();

    match recurring::process_due(&state.db, now) {
        Ok(outcome) if outcome.processed > 0 || outcome.failed > 0 => {
            info!(
                processed = outcome.processed,
                failed = outcome.failed,
                "recurring transactions processed"
            );
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "recurrence job failed"),
    }

    let Some(mailer) = &state.mailer else {
        return;
    };

    if let Err(e) = reports::run_monthly_reports(&state.db, mailer, now, false).await {
        error!(error = %e, "monthly report job failed");
    }
    if let Err(e) = alerts::run_budget_alerts(&state.db, mailer, now).await {
        error!(error = %e, "budget alert job failed");
    }
}
