//! Account endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use penny_core::models::Account;

use crate::{require_user, AppError, AppState};

#[derive(Deserialize)]
pub struct CreateAccount {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(state.db.list_accounts(user.id)?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateAccount>,
) -> Result<Json<Account>, AppError> {
    let user = require_user(&state, &headers)?;
    let account = state.db.create_account(user.id, &body.name, body.is_default)?;
    Ok(Json(account))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(state.db.get_account(user.id, id)?))
}

pub async fn make_default(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(state.db.set_default_account(user.id, id)?))
}
