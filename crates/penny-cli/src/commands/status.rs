//! `penny status`: database and configuration overview

use crate::commands::{database_path, open_database};

pub fn run() -> anyhow::Result<()> {
    let path = database_path()?;
    let db = open_database()?;
    let stats = db.system_stats()?;

    println!("Database: {}", path.display());
    println!("  Users:        {}", stats.user_count);
    println!("  Accounts:     {}", stats.account_count);
    println!("  Transactions: {}", stats.transaction_count);
    println!("  Income total:  {:.2}", stats.total_income);
    println!("  Expense total: {:.2}", stats.total_expenses);

    println!("Configuration:");
    println!("  CLASSIFIER_HOST: {}", configured("CLASSIFIER_HOST"));
    println!("  GEMINI_API_KEY:  {}", configured("GEMINI_API_KEY"));
    println!("  MAILER_API_KEY:  {}", configured("MAILER_API_KEY"));

    Ok(())
}

fn configured(var: &str) -> &'static str {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => "set",
        _ => "not set",
    }
}
