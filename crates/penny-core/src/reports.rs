//! Monthly report job
//!
//! On the first of the month, emails each user a plain-text summary of the
//! previous month: income, expenses, net, and spending per reporting bucket.
//! Runs once per period, enforced through the `job_runs` ledger.

use chrono::{DateTime, Datelike, Days, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::mailer::Mailer;

const JOB_NAME: &str = "monthly_report";

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    /// The month reported on, "YYYY-MM".
    pub period: String,
    pub sent: usize,
    pub failed: usize,
    /// True when the pass did nothing (wrong day, or period already done).
    pub skipped: bool,
}

/// The month preceding the one containing `now`, as "YYYY-MM".
pub fn previous_month(now: DateTime<Utc>) -> String {
    let first_of_month = now
        .date_naive()
        .with_day(1)
        .unwrap_or_else(|| now.date_naive());
    let last_of_previous = first_of_month
        .checked_sub_days(Days::new(1))
        .unwrap_or(first_of_month);
    last_of_previous.format("%Y-%m").to_string()
}

/// Send last month's summary to every user.
///
/// Without `force`, only runs on the first of the month; the scheduler polls
/// hourly and this gate plus the period claim keeps delivery to once per
/// month. Admin triggers pass `force` to re-run on demand.
pub async fn run_monthly_reports(
    db: &Database,
    mailer: &Mailer,
    now: DateTime<Utc>,
    force: bool,
) -> Result<ReportOutcome> {
    let period = previous_month(now);
    let mut outcome = ReportOutcome {
        period: period.clone(),
        sent: 0,
        failed: 0,
        skipped: true,
    };

    if !force {
        if now.day() != 1 {
            return Ok(outcome);
        }
        if !db.try_claim_job(JOB_NAME, &period)? {
            info!(period = %period, "monthly reports already sent");
            return Ok(outcome);
        }
    }

    outcome.skipped = false;
    for user in db.list_users()? {
        let (income, expenses) = db.month_totals(user.id, &period)?;
        let buckets = db.month_expenses_by_bucket(user.id, &period)?;

        let mut body = format!(
            "Hi {},\n\nYour summary for {}:\n\n\
             Income:   {:.2}\nExpenses: {:.2}\nNet:      {:.2}\n",
            user.name,
            period,
            income,
            expenses,
            income - expenses,
        );
        if !buckets.is_empty() {
            body.push_str("\nSpending by category:\n");
            for (bucket, total) in &buckets {
                body.push_str(&format!("  {:<16} {:.2}\n", bucket.as_str(), total));
            }
        }
        body.push_str("\n- Penny");

        let subject = format!("Your {} financial summary", period);
        match mailer.send(&user.email, &subject, &body).await {
            Ok(()) => outcome.sent += 1,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "report delivery failed");
                outcome.failed += 1;
            }
        }
    }

    info!(
        period = %period,
        sent = outcome.sent,
        failed = outcome.failed,
        "monthly report pass complete"
    );
    Ok(outcome)
}
