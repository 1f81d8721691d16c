//! Account operations
//!
//! Ownership is checked on every lookup; an account belonging to another
//! user is indistinguishable from a missing one.

use rusqlite::{params, Row, TransactionBehavior};

use crate::db::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

pub(crate) fn map_account(row: &Row) -> rusqlite::Result<Account> {
    let created_at: String = row.get("created_at")?;
    Ok(Account {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        balance: row.get("balance")?,
        is_default: row.get("is_default")?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create an account. The user's first account becomes the default
    /// automatically; an explicit default displaces the previous one.
    pub fn create_account(&self, user_id: i64, name: &str, is_default: bool) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("account name is required".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM accounts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let make_default = is_default || existing == 0;

        if make_default {
            tx.execute(
                "UPDATE accounts SET is_default = 0 WHERE user_id = ?1",
                params![user_id],
            )?;
        }
        tx.execute(
            "INSERT INTO accounts (user_id, name, is_default) VALUES (?1, ?2, ?3)",
            params![user_id, name, make_default],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.get_account(user_id, id)
    }

    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Account> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM accounts WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            map_account,
        )
        .map_err(|_| Error::NotFound(format!("account {}", id)))
    }

    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM accounts WHERE user_id = ?1 ORDER BY created_at")?;
        let accounts = stmt
            .query_map(params![user_id], map_account)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    /// The user's default account, if any.
    pub fn default_account(&self, user_id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT * FROM accounts WHERE user_id = ?1 AND is_default = 1",
                params![user_id],
                map_account,
            )
            .ok();
        Ok(account)
    }

    /// Make an account the user's default. Clears the previous default in
    /// the same transaction so exactly one default exists at any time.
    pub fn set_default_account(&self, user_id: i64, id: i64) -> Result<Account> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM accounts WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            |row| row.get(0),
        )?;
        if owned == 0 {
            return Err(Error::NotFound(format!("account {}", id)));
        }

        tx.execute(
            "UPDATE accounts SET is_default = 0 WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.execute(
            "UPDATE accounts SET is_default = 1 WHERE id = ?1",
            params![id],
        )?;
        tx.commit()?;

        self.get_account(user_id, id)
    }
}
