//! Core library for Penny, a personal finance tracker
//!
//! Domain models, the transaction categorization pipeline, the SQLite
//! persistence layer, and the scheduled jobs (recurring transactions,
//! monthly reports, budget alerts). The server and CLI crates are thin
//! layers over this one.

pub mod ai;
pub mod alerts;
pub mod db;
pub mod error;
pub mod mailer;
pub mod models;
pub mod recurring;
pub mod reports;
pub mod taxonomy;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use db::Database;
pub use error::{Error, Result, ScanError};
