//! Transaction endpoints
//!
//! Create and update funnel through the categorization pipeline when the
//! caller omits a category but supplies a description. Categorization
//! completes before any balance math; the derived type changes the sign of
//! the delta.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use penny_core::models::{NewTransaction, RecurringInterval, Transaction, TransactionUpdate};
use penny_core::taxonomy::{Category, TransactionType};

use crate::{require_user, AppError, AppState};

#[derive(Deserialize)]
pub struct CreateTransaction {
    /// Falls back to the user's default account.
    pub account_id: Option<i64>,
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub amount: f64,
    pub category: Option<String>,
    pub description: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
}

#[derive(Deserialize, Default)]
pub struct UpdateTransaction {
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub is_recurring: Option<bool>,
    pub recurring_interval: Option<Option<RecurringInterval>>,
}

/// Resolve category and type for a save, running the pipeline only when the
/// caller did not categorize explicitly. Explicit values always win.
async fn resolve_categorization(
    state: &AppState,
    raw_category: Option<&str>,
    explicit_type: Option<TransactionType>,
    description: &str,
) -> (Category, TransactionType) {
    if let Some(raw) = raw_category {
        let category = Category::normalize(raw);
        let tx_type = explicit_type.unwrap_or(if category.is_income() {
            TransactionType::Income
        } else {
            TransactionType::Expense
        });
        return (category, tx_type);
    }

    let prediction = state.pipeline.finalize(description).await;
    (
        prediction.category,
        explicit_type.unwrap_or(prediction.tx_type),
    )
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(state.db.list_transactions(user.id)?))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(state.db.get_transaction(user.id, id)?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let user = require_user(&state, &headers)?;

    let description = body.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::bad_request("description is required"));
    }

    let account_id = match body.account_id {
        Some(id) => id,
        None => state
            .db
            .default_account(user.id)?
            .map(|a| a.id)
            .ok_or_else(|| AppError::bad_request("no account specified and no default account"))?,
    };

    let (category, tx_type) = resolve_categorization(
        &state,
        body.category.as_deref(),
        body.tx_type,
        &description,
    )
    .await;

    let transaction = state.db.create_transaction(
        user.id,
        &NewTransaction {
            account_id,
            tx_type,
            amount: body.amount,
            category,
            description,
            date: body.date.unwrap_or_else(|| Utc::now().date_naive()),
            is_recurring: body.is_recurring,
            recurring_interval: body.recurring_interval,
        },
    )?;

    Ok(Json(transaction))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let user = require_user(&state, &headers)?;

    // re-derive category/type when the description changed without an
    // explicit category
    let (category, tx_type) = match (&body.category, &body.description) {
        (Some(raw), _) => {
            let category = Category::normalize(raw);
            (Some(category), body.tx_type)
        }
        (None, Some(description)) => {
            let prediction = state.pipeline.finalize(description).await;
            (
                Some(prediction.category),
                body.tx_type.or(Some(prediction.tx_type)),
            )
        }
        (None, None) => (None, body.tx_type),
    };

    let transaction = state.db.update_transaction(
        user.id,
        id,
        &TransactionUpdate {
            tx_type,
            amount: body.amount,
            category,
            description: body.description,
            date: body.date,
            is_recurring: body.is_recurring,
            recurring_interval: body.recurring_interval,
        },
    )?;

    Ok(Json(transaction))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_user(&state, &headers)?;
    state.db.delete_transaction(user.id, id)?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
