//! `penny jobs`: run one scheduled job immediately

use anyhow::bail;
use chrono::Utc;

use penny_core::mailer::Mailer;
use penny_core::{alerts, recurring, reports};

use crate::cli::{JobKind, JobsArgs};
use crate::commands::open_database;

pub async fn run(args: JobsArgs) -> anyhow::Result<()> {
    let db = open_database()?;
    let now = Utc::now();

    match args.job {
        JobKind::Recurring => {
            let outcome = recurring::process_due(&db, now)?;
            println!(
                "Recurring: {} processed, {} failed",
                outcome.processed, outcome.failed
            );
            for tx in &outcome.generated {
                println!("  #{} {} {:.2}", tx.id, tx.description, tx.amount);
            }
        }
        JobKind::Reports => {
            let mailer = require_mailer()?;
            let outcome = reports::run_monthly_reports(&db, &mailer, now, true).await?;
            println!(
                "Reports for {}: {} sent, {} failed",
                outcome.period, outcome.sent, outcome.failed
            );
        }
        JobKind::Alerts => {
            let mailer = require_mailer()?;
            let outcome = alerts::run_budget_alerts(&db, &mailer, now).await?;
            println!(
                "Alerts: {} checked, {} alerted, {} failed",
                outcome.checked, outcome.alerted, outcome.failed
            );
        }
    }
    Ok(())
}

fn require_mailer() -> anyhow::Result<Mailer> {
    match Mailer::from_env() {
        Some(mailer) => Ok(mailer),
        None => bail!("set MAILER_API_KEY and MAILER_FROM to send email"),
    }
}
