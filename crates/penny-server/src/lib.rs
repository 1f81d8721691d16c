//! REST API server for Penny
//!
//! Thin HTTP layer over `penny-core`. Identity arrives pre-authenticated as
//! an opaque `x-user-id` header from the fronting identity provider; this
//! server only resolves it against the user table and enforces ownership.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use penny_core::ai::CategorizationPipeline;
use penny_core::mailer::Mailer;
use penny_core::models::{User, UserRole};
use penny_core::{Database, ScanError};

pub mod handlers;
pub mod scheduler;

/// Receipt uploads beyond this are rejected with 413.
pub const MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub pipeline: CategorizationPipeline,
    pub mailer: Option<Mailer>,
}

impl AppState {
    pub fn new(db: Database, pipeline: CategorizationPipeline, mailer: Option<Mailer>) -> Arc<Self> {
        Arc::new(AppState {
            db,
            pipeline,
            mailer,
        })
    }
}

/// API error with a client-safe message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<penny_core::Error> for AppError {
    fn from(e: penny_core::Error) -> Self {
        match e {
            penny_core::Error::NotFound(what) => Self::not_found(what),
            penny_core::Error::InvalidData(msg) => Self::bad_request(msg),
            penny_core::Error::Scan(scan) => scan.into(),
            other => {
                error!(error = %other, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        let status = match &e {
            ScanError::NotAReceipt | ScanError::MissingAmount | ScanError::MissingDescription => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ScanError::MissingApiKey | ScanError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ScanError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ScanError::PermissionDenied
            | ScanError::Api(_)
            | ScanError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

/// Resolve the caller from the `x-user-id` header.
pub fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| AppError::unauthorized("missing or invalid x-user-id header"))?;

    state
        .db
        .get_user(id)
        .map_err(|_| AppError::not_found("unknown user"))
}

/// Resolve the caller and require the admin role.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = require_user(state, headers)?;
    if user.role != UserRole::Admin {
        return Err(AppError::forbidden("admin access required"));
    }
    Ok(user)
}

/// Build the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/accounts",
            get(handlers::accounts::list).post(handlers::accounts::create),
        )
        .route("/accounts/:id", get(handlers::accounts::show))
        .route(
            "/accounts/:id/default",
            post(handlers::accounts::make_default),
        )
        .route(
            "/transactions",
            get(handlers::transactions::list).post(handlers::transactions::create),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::show)
                .put(handlers::transactions::update)
                .delete(handlers::transactions::remove),
        )
        .route("/categorize/predict", post(handlers::categorize::predict))
        .route(
            "/receipts/scan",
            post(handlers::categorize::scan_receipt)
                .layer(DefaultBodyLimit::max(MAX_RECEIPT_BYTES * 2)),
        )
        .route(
            "/budget",
            get(handlers::budgets::show).put(handlers::budgets::set),
        )
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/users/:id", delete(handlers::admin::delete_user))
        .route("/admin/transactions", get(handlers::admin::list_transactions))
        .route(
            "/admin/transactions/:id",
            delete(handlers::admin::delete_transaction),
        )
        .route("/admin/stats", get(handlers::admin::stats))
        .route("/admin/jobs/recurring", post(handlers::admin::run_recurring))
        .route("/admin/jobs/reports", post(handlers::admin::run_reports))
        .route("/admin/jobs/alerts", post(handlers::admin::run_alerts));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn run_server(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
