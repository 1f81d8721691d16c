use chrono::{NaiveDate, TimeZone, Utc};

use crate::db::Database;
use crate::error::Error;
use crate::models::{NewTransaction, RecurringInterval, TransactionUpdate, UserRole};
use crate::taxonomy::{Category, TransactionType};

fn db() -> Database {
    Database::in_memory().unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn new_tx(account_id: i64, tx_type: TransactionType, amount: f64) -> NewTransaction {
    NewTransaction {
        account_id,
        tx_type,
        amount,
        category: Category::Food,
        description: "test".to_string(),
        date: d(2024, 6, 15),
        is_recurring: false,
        recurring_interval: None,
    }
}

fn seed_user_account(db: &Database) -> (i64, i64) {
    let user = db
        .create_user("test@example.com", "Test", UserRole::User)
        .unwrap();
    let account = db.create_account(user.id, "Checking", false).unwrap();
    (user.id, account.id)
}

#[test]
fn test_opens_on_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("penny.db");
    let db = Database::new(path.to_str().unwrap()).unwrap();
    assert!(db.system_stats().unwrap().user_count == 0);
    assert!(path.exists());
}

#[test]
fn test_first_account_becomes_default() {
    let db = db();
    let user = db
        .create_user("a@example.com", "A", UserRole::User)
        .unwrap();
    let first = db.create_account(user.id, "Checking", false).unwrap();
    assert!(first.is_default);

    let second = db.create_account(user.id, "Savings", false).unwrap();
    assert!(!second.is_default);

    // at most one default at any time
    let switched = db.set_default_account(user.id, second.id).unwrap();
    assert!(switched.is_default);
    assert!(!db.get_account(user.id, first.id).unwrap().is_default);
}

#[test]
fn test_account_ownership_checked() {
    let db = db();
    let (_, account) = seed_user_account(&db);
    let other = db
        .create_user("other@example.com", "Other", UserRole::User)
        .unwrap();

    assert!(matches!(
        db.get_account(other.id, account).unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        db.set_default_account(other.id, account).unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_balance_invariant_over_create_update_delete() {
    let db = db();
    let (user, account) = seed_user_account(&db);

    // income +1000, expenses -200 and -50
    let income = db
        .create_transaction(user, &new_tx(account, TransactionType::Income, 1000.0))
        .unwrap();
    let expense = db
        .create_transaction(user, &new_tx(account, TransactionType::Expense, 200.0))
        .unwrap();
    db.create_transaction(user, &new_tx(account, TransactionType::Expense, 50.0))
        .unwrap();
    assert_eq!(db.get_account(user, account).unwrap().balance, 750.0);

    // amount change: -200 becomes -300
    db.update_transaction(
        user,
        expense.id,
        &TransactionUpdate {
            amount: Some(300.0),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(db.get_account(user, account).unwrap().balance, 650.0);

    // type flip: +1000 income becomes -1000 expense, delta -2000
    db.update_transaction(
        user,
        income.id,
        &TransactionUpdate {
            tx_type: Some(TransactionType::Expense),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(db.get_account(user, account).unwrap().balance, -1350.0);

    // delete reverses the signed amount
    db.delete_transaction(user, expense.id).unwrap();
    assert_eq!(db.get_account(user, account).unwrap().balance, -1050.0);

    // final balance equals the sum of surviving signed amounts
    let surviving: f64 = db
        .list_transactions(user)
        .unwrap()
        .iter()
        .map(|t| t.signed_amount())
        .sum();
    assert_eq!(db.get_account(user, account).unwrap().balance, surviving);
}

#[test]
fn test_transaction_ownership_checked() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    let tx = db
        .create_transaction(user, &new_tx(account, TransactionType::Expense, 10.0))
        .unwrap();

    let other = db
        .create_user("other@example.com", "Other", UserRole::User)
        .unwrap();
    assert!(matches!(
        db.get_transaction(other.id, tx.id).unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        db.delete_transaction(other.id, tx.id).unwrap_err(),
        Error::NotFound(_)
    ));
    // the failed delete must not have touched the balance
    assert_eq!(db.get_account(user, account).unwrap().balance, -10.0);
}

#[test]
fn test_create_rejects_foreign_account() {
    let db = db();
    let (_, account) = seed_user_account(&db);
    let other = db
        .create_user("other@example.com", "Other", UserRole::User)
        .unwrap();

    let err = db
        .create_transaction(other.id, &new_tx(account, TransactionType::Expense, 10.0))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_recurring_transaction_gets_next_date() {
    let db = db();
    let (user, account) = seed_user_account(&db);

    let tx = db
        .create_transaction(
            user,
            &NewTransaction {
                is_recurring: true,
                recurring_interval: Some(RecurringInterval::Monthly),
                date: d(2024, 1, 31),
                ..new_tx(account, TransactionType::Expense, 15.0)
            },
        )
        .unwrap();
    // month-end clamps to Feb 29 in a leap year
    assert_eq!(tx.next_recurring_date, Some(d(2024, 2, 29)));
}

#[test]
fn test_recurring_without_interval_rejected() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    let err = db
        .create_transaction(
            user,
            &NewTransaction {
                is_recurring: true,
                recurring_interval: None,
                ..new_tx(account, TransactionType::Expense, 15.0)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}

#[test]
fn test_due_recurring_selection() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

    // never processed: due regardless of next date
    let never = db
        .create_transaction(
            user,
            &NewTransaction {
                is_recurring: true,
                recurring_interval: Some(RecurringInterval::Monthly),
                date: d(2024, 6, 1),
                ..new_tx(account, TransactionType::Expense, 20.0)
            },
        )
        .unwrap();

    // non-recurring rows never appear
    db.create_transaction(user, &new_tx(account, TransactionType::Expense, 5.0))
        .unwrap();

    let due = db.due_recurring(now).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, never.id);

    // after processing, the next date is a month out and the row is no longer due
    db.spawn_recurring_instance(&due[0], now).unwrap();
    assert!(db.due_recurring(now).unwrap().is_empty());

    let source = db.get_transaction(user, never.id).unwrap();
    assert_eq!(source.next_recurring_date, Some(d(2024, 7, 15)));
    assert!(source.last_processed.is_some());
}

#[test]
fn test_spawn_recurring_instance_is_atomic() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

    let source = db
        .create_transaction(
            user,
            &NewTransaction {
                is_recurring: true,
                recurring_interval: Some(RecurringInterval::Weekly),
                description: "Gym membership".to_string(),
                ..new_tx(account, TransactionType::Expense, 30.0)
            },
        )
        .unwrap();
    let balance_before = db.get_account(user, account).unwrap().balance;

    let instance = db.spawn_recurring_instance(&source, now).unwrap();
    assert_eq!(instance.description, "Gym membership (Recurring)");
    assert!(!instance.is_recurring);
    assert_eq!(instance.date, now.date_naive());
    assert_eq!(
        db.get_account(user, account).unwrap().balance,
        balance_before - 30.0
    );
}

#[test]
fn test_budget_upsert_and_status() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

    db.set_budget(user, 1000.0).unwrap();
    db.create_transaction(user, &new_tx(account, TransactionType::Expense, 850.0))
        .unwrap();

    let status = db.budget_status(user, now).unwrap().unwrap();
    assert_eq!(status.amount, 1000.0);
    assert_eq!(status.spent, 850.0);
    assert_eq!(status.remaining, 150.0);
    assert!((status.usage - 0.85).abs() < 1e-9);

    // replacing the budget clears the alert stamp
    db.mark_alert_sent(user, now).unwrap();
    assert!(db.get_budget(user).unwrap().unwrap().last_alert_sent.is_some());
    db.set_budget(user, 2000.0).unwrap();
    assert!(db.get_budget(user).unwrap().unwrap().last_alert_sent.is_none());
}

#[test]
fn test_job_claim_idempotent() {
    let db = db();
    assert!(db.try_claim_job("monthly_report", "2024-05").unwrap());
    assert!(!db.try_claim_job("monthly_report", "2024-05").unwrap());
    assert!(db.try_claim_job("monthly_report", "2024-06").unwrap());
}

#[test]
fn test_month_expenses_fold_bills_into_utilities() {
    let db = db();
    let (user, account) = seed_user_account(&db);

    for (category, amount) in [
        (Category::Bills, 40.0),
        (Category::Utilities, 60.0),
        (Category::Food, 25.0),
    ] {
        db.create_transaction(
            user,
            &NewTransaction {
                category,
                ..new_tx(account, TransactionType::Expense, amount)
            },
        )
        .unwrap();
    }

    let buckets = db.month_expenses_by_bucket(user, "2024-06").unwrap();
    assert_eq!(buckets[0], (Category::Utilities, 100.0));
    assert_eq!(buckets[1], (Category::Food, 25.0));
}

#[test]
fn test_delete_user_cascades() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    db.create_transaction(user, &new_tx(account, TransactionType::Expense, 10.0))
        .unwrap();
    db.set_budget(user, 500.0).unwrap();

    db.delete_user(user).unwrap();

    let stats = db.system_stats().unwrap();
    assert_eq!(stats.user_count, 0);
    assert_eq!(stats.account_count, 0);
    assert_eq!(stats.transaction_count, 0);
}

#[test]
fn test_system_stats_totals() {
    let db = db();
    let (user, account) = seed_user_account(&db);
    db.create_transaction(user, &new_tx(account, TransactionType::Income, 500.0))
        .unwrap();
    db.create_transaction(user, &new_tx(account, TransactionType::Expense, 120.0))
        .unwrap();

    let stats = db.system_stats().unwrap();
    assert_eq!(stats.total_income, 500.0);
    assert_eq!(stats.total_expenses, 120.0);
    assert_eq!(stats.transaction_count, 2);
}

#[test]
fn test_duplicate_email_rejected() {
    let db = db();
    db.create_user("dup@example.com", "One", UserRole::User)
        .unwrap();
    assert!(db
        .create_user("dup@example.com", "Two", UserRole::User)
        .is_err());
}
