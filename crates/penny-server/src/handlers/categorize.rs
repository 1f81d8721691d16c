//! Free-text prediction and receipt scanning

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use penny_core::ai::types::{CategoryPrediction, ScannedReceipt};

use crate::{require_user, AppError, AppState, MAX_RECEIPT_BYTES};

#[derive(Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// Interactive pre-submit prediction. Cannot fail: the pipeline bottoms out
/// at the neutral default.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PredictRequest>,
) -> Result<Json<CategoryPrediction>, AppError> {
    require_user(&state, &headers)?;

    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("text is required"));
    }

    Ok(Json(state.pipeline.finalize(text).await))
}

/// Scan a receipt image posted as the raw request body.
///
/// The MIME type must be `image/*` and the payload at most 5 MB; the two
/// rejections are distinct so clients can tell them apart.
pub async fn scan_receipt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScannedReceipt>, AppError> {
    require_user(&state, &headers)?;

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !mime.starts_with("image/") {
        return Err(AppError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "receipt uploads must be an image",
        ));
    }

    if body.len() > MAX_RECEIPT_BYTES {
        return Err(AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "receipt image exceeds the 5MB limit",
        ));
    }
    if body.is_empty() {
        return Err(AppError::bad_request("empty request body"));
    }

    let receipt = state.pipeline.scan_receipt(&body, &mime).await?;
    Ok(Json(receipt))
}
