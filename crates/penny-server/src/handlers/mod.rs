//! Request handlers, split by resource

pub mod accounts;
pub mod admin;
pub mod budgets;
pub mod categorize;
pub mod transactions;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
