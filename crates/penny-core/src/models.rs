//! Domain models shared across the workspace

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{Category, TransactionType};

/// Application user. Identity comes from an external provider; we only keep
/// the profile needed for ownership checks and email delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

/// Money account. `balance` is the running total of all signed transaction
/// amounts; every ledger write adjusts it in the same database transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub balance: f64,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Recurrence cadence for recurring transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurringInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringInterval::Daily => "DAILY",
            RecurringInterval::Weekly => "WEEKLY",
            RecurringInterval::Monthly => "MONTHLY",
            RecurringInterval::Yearly => "YEARLY",
        }
    }
}

impl FromStr for RecurringInterval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(RecurringInterval::Daily),
            "WEEKLY" => Ok(RecurringInterval::Weekly),
            "MONTHLY" => Ok(RecurringInterval::Monthly),
            "YEARLY" => Ok(RecurringInterval::Yearly),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RecurringInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advance a date by one recurrence interval.
///
/// Monthly and yearly steps clamp at month end (Jan 31 + 1 month lands on
/// Feb 29 in a leap year, Feb 28 otherwise). Daily and weekly steps are
/// plain day arithmetic.
pub fn advance_date(date: NaiveDate, interval: RecurringInterval) -> NaiveDate {
    let next = match interval {
        RecurringInterval::Daily => date.checked_add_days(Days::new(1)),
        RecurringInterval::Weekly => date.checked_add_days(Days::new(7)),
        RecurringInterval::Monthly => date.checked_add_months(Months::new(1)),
        RecurringInterval::Yearly => date.checked_add_months(Months::new(12)),
    };
    // checked_add only fails at the far ends of the representable range
    next.unwrap_or(date)
}

/// Persisted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: f64,
    pub category: Category,
    pub description: String,
    pub date: NaiveDate,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
    pub last_processed: Option<DateTime<Utc>>,
    pub next_recurring_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed amount of this transaction (income positive, expense negative).
    pub fn signed_amount(&self) -> f64 {
        self.tx_type.signed(self.amount)
    }
}

/// Input for creating a transaction. Category and type are already resolved
/// by the time this reaches the ledger; categorization happens upstream.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub tx_type: TransactionType,
    pub amount: f64,
    pub category: Category,
    pub description: String,
    pub date: NaiveDate,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
}

/// Partial update for an existing transaction. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub tx_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub is_recurring: Option<bool>,
    pub recurring_interval: Option<Option<RecurringInterval>>,
}

/// Monthly spending budget, one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub last_alert_sent: Option<DateTime<Utc>>,
}

/// A budget together with current-month usage.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub amount: f64,
    pub spent: f64,
    pub remaining: f64,
    /// Fraction of the budget consumed this month, 0.0 when the budget is 0.
    pub usage: f64,
}

/// System-wide counters for the admin console.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub user_count: i64,
    pub account_count: i64,
    pub transaction_count: i64,
    pub total_income: f64,
    pub total_expenses: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_advance_daily_weekly() {
        assert_eq!(
            advance_date(d(2024, 3, 10), RecurringInterval::Daily),
            d(2024, 3, 11)
        );
        assert_eq!(
            advance_date(d(2024, 12, 28), RecurringInterval::Weekly),
            d(2025, 1, 4)
        );
    }

    #[test]
    fn test_advance_monthly_clamps_month_end() {
        // Jan 31 2024 + 1 month clamps to leap-day Feb 29
        assert_eq!(
            advance_date(d(2024, 1, 31), RecurringInterval::Monthly),
            d(2024, 2, 29)
        );
        // non-leap year clamps to Feb 28
        assert_eq!(
            advance_date(d(2025, 1, 31), RecurringInterval::Monthly),
            d(2025, 2, 28)
        );
        // mid-month dates are unaffected
        assert_eq!(
            advance_date(d(2024, 1, 15), RecurringInterval::Monthly),
            d(2024, 2, 15)
        );
    }

    #[test]
    fn test_advance_yearly_leap_day() {
        assert_eq!(
            advance_date(d(2024, 2, 29), RecurringInterval::Yearly),
            d(2025, 2, 28)
        );
    }

    #[test]
    fn test_signed_amount() {
        let tx = Transaction {
            id: 1,
            user_id: 1,
            account_id: 1,
            tx_type: TransactionType::Expense,
            amount: 42.5,
            category: Category::Food,
            description: "lunch".to_string(),
            date: d(2024, 5, 1),
            is_recurring: false,
            recurring_interval: None,
            last_processed: None,
            next_recurring_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(tx.signed_amount(), -42.5);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("monthly".parse(), Ok(RecurringInterval::Monthly));
        assert_eq!("YEARLY".parse(), Ok(RecurringInterval::Yearly));
        assert!("fortnightly".parse::<RecurringInterval>().is_err());
    }
}
