//! Error types for Penny

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Receipt scan failures, each with its own user-facing message.
///
/// `NotAReceipt`, `MissingAmount`, and `MissingDescription` are the only
/// categorization-adjacent failures that reach the end user; everything else
/// describes why the vision call itself could not complete.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Receipt scanning is not configured (missing API key)")]
    MissingApiKey,

    #[error("Receipt scanning quota exceeded, try again later")]
    QuotaExceeded,

    #[error("Receipt scanning permission denied (check API key)")]
    PermissionDenied,

    #[error("The vision model is currently unavailable")]
    ModelUnavailable,

    #[error("Receipt scanning failed: {0}")]
    Api(String),

    #[error("Could not understand the scan result: {0}")]
    MalformedResponse(String),

    #[error("This image does not appear to be a receipt")]
    NotAReceipt,

    #[error("Could not read an amount from the receipt, please enter it manually")]
    MissingAmount,

    #[error("Could not read a description from the receipt, please enter it manually")]
    MissingDescription,
}

pub type Result<T> = std::result::Result<T, Error>;
