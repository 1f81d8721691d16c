//! Budget alert job
//!
//! Emails users who have burned through most of their monthly budget. Sends
//! at most one alert per user per calendar month, tracked on the budget row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{alerted_this_month, Database};
use crate::error::Result;
use crate::mailer::Mailer;

/// Usage fraction at which a warning goes out.
pub const ALERT_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct AlertOutcome {
    pub checked: usize,
    pub alerted: usize,
    pub failed: usize,
}

/// Check every budgeted user and email those over the threshold.
pub async fn run_budget_alerts(
    db: &Database,
    mailer: &Mailer,
    now: DateTime<Utc>,
) -> Result<AlertOutcome> {
    let mut outcome = AlertOutcome {
        checked: 0,
        alerted: 0,
        failed: 0,
    };

    for (user, budget) in db.users_with_budgets()? {
        outcome.checked += 1;

        if budget.amount <= 0.0 || alerted_this_month(&budget, now) {
            continue;
        }

        let spent = db.current_month_expenses(user.id, now)?;
        let usage = spent / budget.amount;
        if usage < ALERT_THRESHOLD {
            continue;
        }

        let subject = format!("Budget alert: {:.0}% used", usage * 100.0);
        let body = format!(
            "Hi {},\n\nYou've spent {:.2} of your {:.2} monthly budget ({:.0}%).\n\
             Remaining: {:.2}.\n\n- Penny",
            user.name,
            spent,
            budget.amount,
            usage * 100.0,
            budget.amount - spent,
        );

        match mailer.send(&user.email, &subject, &body).await {
            Ok(()) => {
                db.mark_alert_sent(user.id, now)?;
                outcome.alerted += 1;
            }
            Err(e) => {
                warn!(user_id = user.id, error = %e, "budget alert delivery failed");
                outcome.failed += 1;
            }
        }
    }

    info!(
        checked = outcome.checked,
        alerted = outcome.alerted,
        failed = outcome.failed,
        "budget alert pass complete"
    );
    Ok(outcome)
}
