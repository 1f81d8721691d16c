//! Recurrence engine
//!
//! Regenerates due recurring transactions. Each item is processed in its own
//! database transaction; a failing item logs a warning and the batch
//! continues.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::Transaction;

/// Result of one recurrence pass.
#[derive(Debug, Clone, Serialize)]
pub struct RecurrenceOutcome {
    pub processed: usize,
    pub failed: usize,
    pub generated: Vec<Transaction>,
}

/// Process every recurring transaction due at `now`.
pub fn process_due(db: &Database, now: DateTime<Utc>) -> Result<RecurrenceOutcome> {
    let due = db.due_recurring(now)?;
    let mut outcome = RecurrenceOutcome {
        processed: 0,
        failed: 0,
        generated: Vec::new(),
    };

    for source in &due {
        match db.spawn_recurring_instance(source, now) {
            Ok(instance) => {
                outcome.processed += 1;
                outcome.generated.push(instance);
            }
            Err(e) => {
                warn!(
                    transaction_id = source.id,
                    error = %e,
                    "skipping recurring transaction"
                );
                outcome.failed += 1;
            }
        }
    }

    info!(
        due = due.len(),
        processed = outcome.processed,
        failed = outcome.failed,
        "recurrence pass complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::models::{NewTransaction, RecurringInterval, UserRole};
    use crate::taxonomy::{Category, TransactionType};

    fn setup() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let user = db
            .create_user("r@example.com", "R", UserRole::User)
            .unwrap();
        let account = db.create_account(user.id, "Checking", false).unwrap();
        (db, user.id, account.id)
    }

    fn recurring(account_id: i64, description: &str, interval: RecurringInterval) -> NewTransaction {
        NewTransaction {
            account_id,
            tx_type: TransactionType::Expense,
            amount: 9.99,
            category: Category::Entertainment,
            description: description.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            is_recurring: true,
            recurring_interval: Some(interval),
        }
    }

    #[test]
    fn test_processes_all_due() {
        let (db, user, account) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();

        db.create_transaction(user, &recurring(account, "Netflix", RecurringInterval::Monthly))
            .unwrap();
        db.create_transaction(user, &recurring(account, "Gym", RecurringInterval::Weekly))
            .unwrap();

        let outcome = process_due(&db, now).unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 0);
        assert!(outcome
            .generated
            .iter()
            .all(|t| t.description.ends_with("(Recurring)") && !t.is_recurring));

        // a second pass finds nothing due
        let again = process_due(&db, now).unwrap();
        assert_eq!(again.processed, 0);
    }

    #[test]
    fn test_one_bad_item_does_not_abort_the_batch() {
        let (db, user, account) = setup();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();

        db.create_transaction(user, &recurring(account, "Netflix", RecurringInterval::Monthly))
            .unwrap();
        let broken = db
            .create_transaction(user, &recurring(account, "Gym", RecurringInterval::Weekly))
            .unwrap();
        // strip the interval out from under the engine
        db.conn()
            .unwrap()
            .execute(
                "UPDATE transactions SET recurring_interval = NULL WHERE id = ?1",
                rusqlite::params![broken.id],
            )
            .unwrap();

        let outcome = process_due(&db, now).unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.generated[0].description, "Netflix (Recurring)");
    }
}
