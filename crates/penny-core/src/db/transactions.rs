//! Ledger operations
//!
//! Every write that touches a transaction row also adjusts the owning
//! account's balance inside the same immediate SQLite transaction. The
//! balance invariant: after any create/update/delete, balance equals the
//! prior balance plus the signed delta (income positive, expense negative).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use tracing::debug;

use crate::db::{format_datetime, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{advance_date, NewTransaction, Transaction, TransactionUpdate};
use crate::taxonomy::{Category, TransactionType};

/// Suffix marking transactions generated by the recurrence engine.
pub const RECURRING_SUFFIX: &str = " (Recurring)";

pub(crate) fn map_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let tx_type: String = row.get("type")?;
    let category: String = row.get("category")?;
    let date: String = row.get("date")?;
    let interval: Option<String> = row.get("recurring_interval")?;
    let last_processed: Option<String> = row.get("last_processed")?;
    let next_date: Option<String> = row.get("next_recurring_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Transaction {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        account_id: row.get("account_id")?,
        tx_type: tx_type.parse().unwrap_or(TransactionType::Expense),
        amount: row.get("amount")?,
        category: Category::normalize(&category),
        description: row.get("description")?,
        date: parse_date(&date),
        is_recurring: row.get("is_recurring")?,
        recurring_interval: interval.and_then(|i| i.parse().ok()),
        last_processed: last_processed.map(|s| parse_datetime(&s)),
        next_recurring_date: next_date.map(|s| parse_date(&s)),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn fetch_owned(conn: &Connection, user_id: i64, id: i64) -> Result<Transaction> {
    conn.query_row(
        "SELECT * FROM transactions WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
        map_transaction,
    )
    .map_err(|_| Error::NotFound(format!("transaction {}", id)))
}

fn verify_account(conn: &Connection, user_id: i64, account_id: i64) -> Result<()> {
    let owned: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE id = ?1 AND user_id = ?2",
        params![account_id, user_id],
        |row| row.get(0),
    )?;
    if owned == 0 {
        return Err(Error::NotFound(format!("account {}", account_id)));
    }
    Ok(())
}

fn apply_balance_delta(conn: &Connection, account_id: i64, delta: f64) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET balance = balance + ?1 WHERE id = ?2",
        params![delta, account_id],
    )?;
    Ok(())
}

impl Database {
    /// Insert a transaction and adjust the account balance atomically.
    ///
    /// Category and type are already resolved by the caller; this layer only
    /// does ledger math.
    pub fn create_transaction(&self, user_id: i64, new: &NewTransaction) -> Result<Transaction> {
        if new.amount < 0.0 {
            return Err(Error::InvalidData("amount must be non-negative".to_string()));
        }
        if new.is_recurring && new.recurring_interval.is_none() {
            return Err(Error::InvalidData(
                "recurring transactions need an interval".to_string(),
            ));
        }

        let next_date = new
            .recurring_interval
            .filter(|_| new.is_recurring)
            .map(|interval| advance_date(new.date, interval));

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        verify_account(&tx, user_id, new.account_id)?;

        tx.execute(
            r#"
            INSERT INTO transactions
                (user_id, account_id, type, amount, category, description, date,
                 is_recurring, recurring_interval, next_recurring_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                user_id,
                new.account_id,
                new.tx_type.as_str(),
                new.amount,
                new.category.as_str(),
                new.description,
                new.date.to_string(),
                new.is_recurring,
                new.recurring_interval.map(|i| i.as_str()),
                next_date.map(|d| d.to_string()),
            ],
        )?;
        let id = tx.last_insert_rowid();

        apply_balance_delta(&tx, new.account_id, new.tx_type.signed(new.amount))?;

        let created = fetch_owned(&tx, user_id, id)?;
        tx.commit()?;

        debug!(id, amount = new.amount, "transaction created");
        Ok(created)
    }

    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        fetch_owned(&conn, user_id, id)
    }

    pub fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM transactions WHERE user_id = ?1 ORDER BY date DESC, id DESC",
        )?;
        let transactions = stmt
            .query_map(params![user_id], map_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// Update fields and apply the balance delta atomically.
    ///
    /// Delta = new signed amount - old signed amount, so a type flip changes
    /// the sign, not just the magnitude.
    pub fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        update: &TransactionUpdate,
    ) -> Result<Transaction> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let old = fetch_owned(&tx, user_id, id)?;

        let tx_type = update.tx_type.unwrap_or(old.tx_type);
        let amount = update.amount.unwrap_or(old.amount);
        let category = update.category.unwrap_or(old.category);
        let description = update.description.clone().unwrap_or(old.description.clone());
        let date = update.date.unwrap_or(old.date);
        let is_recurring = update.is_recurring.unwrap_or(old.is_recurring);
        let interval = update
            .recurring_interval
            .unwrap_or(old.recurring_interval);

        if amount < 0.0 {
            return Err(Error::InvalidData("amount must be non-negative".to_string()));
        }
        if is_recurring && interval.is_none() {
            return Err(Error::InvalidData(
                "recurring transactions need an interval".to_string(),
            ));
        }

        let recurrence_changed = date != old.date
            || is_recurring != old.is_recurring
            || interval != old.recurring_interval;
        let next_date = if !is_recurring {
            None
        } else if recurrence_changed {
            interval.map(|i| advance_date(date, i))
        } else {
            old.next_recurring_date
        };

        tx.execute(
            r#"
            UPDATE transactions
            SET type = ?1, amount = ?2, category = ?3, description = ?4, date = ?5,
                is_recurring = ?6, recurring_interval = ?7, next_recurring_date = ?8,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?9
            "#,
            params![
                tx_type.as_str(),
                amount,
                category.as_str(),
                description,
                date.to_string(),
                is_recurring,
                interval.map(|i| i.as_str()),
                next_date.map(|d| d.to_string()),
                id,
            ],
        )?;

        let delta = tx_type.signed(amount) - old.signed_amount();
        apply_balance_delta(&tx, old.account_id, delta)?;

        let updated = fetch_owned(&tx, user_id, id)?;
        tx.commit()?;

        Ok(updated)
    }

    /// Delete a transaction, reversing its balance contribution atomically.
    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let old = fetch_owned(&tx, user_id, id)?;
        tx.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        apply_balance_delta(&tx, old.account_id, -old.signed_amount())?;

        tx.commit()?;
        Ok(())
    }

    /// All transactions across all users, for the admin console.
    pub fn list_all_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM transactions ORDER BY date DESC, id DESC")?;
        let transactions = stmt
            .query_map([], map_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// Admin delete: no ownership check, but the balance is still reversed.
    pub fn admin_delete_transaction(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let old = tx
            .query_row(
                "SELECT * FROM transactions WHERE id = ?1",
                params![id],
                map_transaction,
            )
            .map_err(|_| Error::NotFound(format!("transaction {}", id)))?;
        tx.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        apply_balance_delta(&tx, old.account_id, -old.signed_amount())?;

        tx.commit()?;
        Ok(())
    }

    /// Recurring transactions due at `now`: never processed, or whose next
    /// date has arrived.
    pub fn due_recurring(&self, now: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM transactions
            WHERE is_recurring = 1
              AND (last_processed IS NULL OR next_recurring_date <= ?1)
            ORDER BY id
            "#,
        )?;
        let due = stmt
            .query_map(params![now.date_naive().to_string()], map_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(due)
    }

    /// Generate one instance of a due recurring transaction.
    ///
    /// Atomically: insert the non-recurring instance, apply its balance
    /// delta, and advance the source row's bookkeeping from `now`.
    pub fn spawn_recurring_instance(
        &self,
        source: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let interval = source.recurring_interval.ok_or_else(|| {
            Error::InvalidData(format!("recurring transaction {} has no interval", source.id))
        })?;

        let today = now.date_naive();
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        verify_account(&tx, source.user_id, source.account_id)?;

        tx.execute(
            r#"
            INSERT INTO transactions
                (user_id, account_id, type, amount, category, description, date, is_recurring)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
            "#,
            params![
                source.user_id,
                source.account_id,
                source.tx_type.as_str(),
                source.amount,
                source.category.as_str(),
                format!("{}{}", source.description, RECURRING_SUFFIX),
                today.to_string(),
            ],
        )?;
        let instance_id = tx.last_insert_rowid();

        apply_balance_delta(&tx, source.account_id, source.signed_amount())?;

        tx.execute(
            r#"
            UPDATE transactions
            SET last_processed = ?1, next_recurring_date = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?3
            "#,
            params![
                format_datetime(now),
                advance_date(today, interval).to_string(),
                source.id,
            ],
        )?;

        let instance = fetch_owned(&tx, source.user_id, instance_id)?;
        tx.commit()?;

        Ok(instance)
    }

    /// Total expenses for a user in the month containing `now`.
    pub fn current_month_expenses(&self, user_id: i64, now: DateTime<Utc>) -> Result<f64> {
        let month = now.format("%Y-%m").to_string();
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM transactions
            WHERE user_id = ?1 AND type = 'EXPENSE' AND strftime('%Y-%m', date) = ?2
            "#,
            params![user_id, month],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Income and expense totals for a user in a given month ("YYYY-MM").
    pub fn month_totals(&self, user_id: i64, month: &str) -> Result<(f64, f64)> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'INCOME' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN type = 'EXPENSE' THEN amount END), 0)
            FROM transactions
            WHERE user_id = ?1 AND strftime('%Y-%m', date) = ?2
            "#,
            params![user_id, month],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(Error::from)
    }

    /// Expense totals per reporting bucket for a month ("YYYY-MM").
    /// `bills` folds into `utilities` here.
    pub fn month_expenses_by_bucket(
        &self,
        user_id: i64,
        month: &str,
    ) -> Result<Vec<(Category, f64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category, SUM(amount) AS total FROM transactions
            WHERE user_id = ?1 AND type = 'EXPENSE' AND strftime('%Y-%m', date) = ?2
            GROUP BY category
            "#,
        )?;
        let rows = stmt
            .query_map(params![user_id, month], |row| {
                let category: String = row.get("category")?;
                let total: f64 = row.get("total")?;
                Ok((category, total))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // fold raw categories into reporting buckets, preserving first-seen order
        let mut buckets: Vec<(Category, f64)> = Vec::new();
        for (raw, total) in rows {
            let bucket = Category::normalize(&raw).reporting_bucket();
            match buckets.iter_mut().find(|(c, _)| *c == bucket) {
                Some((_, sum)) => *sum += total,
                None => buckets.push((bucket, total)),
            }
        }
        buckets.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(buckets)
    }
}
