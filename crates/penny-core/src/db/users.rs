//! User operations and admin stats

use rusqlite::{params, Row};

use crate::db::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{SystemStats, User, UserRole};

pub(crate) fn map_user(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get("role")?;
    let created_at: String = row.get("created_at")?;
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        role: role.parse().unwrap_or(UserRole::User),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    pub fn create_user(&self, email: &str, name: &str, role: UserRole) -> Result<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData(format!("invalid email: {}", email)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email, name, role) VALUES (?1, ?2, ?3)",
            params![email, name.trim(), role.as_str()],
        )?;
        let id = conn.last_insert_rowid();
        self.get_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], map_user)
            .map_err(|_| Error::NotFound(format!("user {}", id)))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT * FROM users WHERE email = ?1",
                params![email.trim().to_lowercase()],
                map_user,
            )
            .ok();
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY created_at")?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Delete a user and, via foreign keys, their accounts, transactions,
    /// and budget.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// System-wide counters for the admin console.
    pub fn system_stats(&self) -> Result<SystemStats> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS user_count,
                (SELECT COUNT(*) FROM accounts) AS account_count,
                (SELECT COUNT(*) FROM transactions) AS transaction_count,
                (SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE type = 'INCOME')
                    AS total_income,
                (SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE type = 'EXPENSE')
                    AS total_expenses
            "#,
            [],
            |row| {
                Ok(SystemStats {
                    user_count: row.get("user_count")?,
                    account_count: row.get("account_count")?,
                    transaction_count: row.get("transaction_count")?,
                    total_income: row.get("total_income")?,
                    total_expenses: row.get("total_expenses")?,
                })
            },
        )
        .map_err(Error::from)
    }
}
