//! Budget operations

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, Row};

use crate::db::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetStatus, User};

fn map_budget(row: &Row) -> rusqlite::Result<Budget> {
    let last_alert_sent: Option<String> = row.get("last_alert_sent")?;
    Ok(Budget {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        amount: row.get("amount")?,
        last_alert_sent: last_alert_sent.map(|s| parse_datetime(&s)),
    })
}

impl Database {
    /// Set or replace a user's monthly budget. Resets the alert stamp so a
    /// new budget gets a fresh alert cycle.
    pub fn set_budget(&self, user_id: i64, amount: f64) -> Result<Budget> {
        if amount < 0.0 {
            return Err(Error::InvalidData("budget must be non-negative".to_string()));
        }
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budgets (user_id, amount) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET amount = ?2, last_alert_sent = NULL
            "#,
            params![user_id, amount],
        )?;
        self.get_budget(user_id)?
            .ok_or_else(|| Error::NotFound(format!("budget for user {}", user_id)))
    }

    pub fn get_budget(&self, user_id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                "SELECT * FROM budgets WHERE user_id = ?1",
                params![user_id],
                map_budget,
            )
            .ok();
        Ok(budget)
    }

    /// A user's budget with current-month usage, or None without a budget.
    pub fn budget_status(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetStatus>> {
        let Some(budget) = self.get_budget(user_id)? else {
            return Ok(None);
        };
        let spent = self.current_month_expenses(user_id, now)?;
        let usage = if budget.amount > 0.0 {
            spent / budget.amount
        } else {
            0.0
        };
        Ok(Some(BudgetStatus {
            amount: budget.amount,
            spent,
            remaining: budget.amount - spent,
            usage,
        }))
    }

    /// Stamp the budget as having alerted at `now`.
    pub fn mark_alert_sent(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE budgets SET last_alert_sent = ?1 WHERE user_id = ?2",
            params![format_datetime(now), user_id],
        )?;
        Ok(())
    }

    /// All users that have a budget configured, with their budgets.
    pub fn users_with_budgets(&self) -> Result<Vec<(User, Budget)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT u.*, b.id AS b_id, b.amount AS b_amount, b.last_alert_sent AS b_alert
            FROM users u JOIN budgets b ON b.user_id = u.id
            ORDER BY u.id
            "#,
        )?;
        let pairs = stmt
            .query_map([], |row| {
                let user = super::users::map_user(row)?;
                let last_alert: Option<String> = row.get("b_alert")?;
                let budget = Budget {
                    id: row.get("b_id")?,
                    user_id: user.id,
                    amount: row.get("b_amount")?,
                    last_alert_sent: last_alert.map(|s| parse_datetime(&s)),
                };
                Ok((user, budget))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs)
    }
}

/// Whether an alert stamp falls in the same calendar month as `now`.
pub fn alerted_this_month(budget: &Budget, now: DateTime<Utc>) -> bool {
    budget
        .last_alert_sent
        .map(|sent| sent.year() == now.year() && sent.month() == now.month())
        .unwrap_or(false)
}
