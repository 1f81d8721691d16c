//! Admin console endpoints
//!
//! All routes here require the admin role. Job triggers run the same
//! functions the scheduler does, forced past the calendar gates.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use penny_core::mailer::Mailer;
use penny_core::models::{SystemStats, Transaction, User};
use penny_core::{alerts, recurring, reports};

use crate::{require_admin, AppError, AppState};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.db.list_users()?))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let admin = require_admin(&state, &headers)?;
    if admin.id == id {
        return Err(AppError::bad_request("cannot delete your own account"));
    }
    state.db.delete_user(id)?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, AppError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.db.list_all_transactions()?))
}

pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;
    state.db.admin_delete_transaction(id)?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SystemStats>, AppError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.db.system_stats()?))
}

fn require_mailer(state: &AppState) -> Result<&Mailer, AppError> {
    state.mailer.as_ref().ok_or_else(|| {
        AppError::new(StatusCode::SERVICE_UNAVAILABLE, "mailer not configured")
    })
}

pub async fn run_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;
    let outcome = recurring::process_due(&state.db, Utc::now())?;
    Ok(Json(json!(outcome)))
}

pub async fn run_reports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;
    let mailer = require_mailer(&state)?;
    let outcome = reports::run_monthly_reports(&state.db, mailer, Utc::now(), true).await?;
    Ok(Json(json!(outcome)))
}

pub async fn run_alerts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers)?;
    let mailer = require_mailer(&state)?;
    let outcome = alerts::run_budget_alerts(&state.db, mailer, Utc::now()).await?;
    Ok(Json(json!(outcome)))
}
