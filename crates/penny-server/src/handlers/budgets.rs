//! Budget endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{require_user, AppError, AppState};

#[derive(Deserialize)]
pub struct SetBudget {
    pub amount: f64,
}

/// The caller's budget with current-month usage, or nulls when unset.
pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = require_user(&state, &headers)?;
    match state.db.budget_status(user.id, Utc::now())? {
        Some(status) => Ok(Json(json!(status))),
        None => Ok(Json(json!({ "amount": null, "spent": null }))),
    }
}

pub async fn set(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetBudget>,
) -> Result<Json<Value>, AppError> {
    let user = require_user(&state, &headers)?;
    state.db.set_budget(user.id, body.amount)?;
    let status = state.db.budget_status(user.id, Utc::now())?;
    Ok(Json(json!(status)))
}
