//! Local ML classifier client
//!
//! Thin wrapper around a local prediction service. Every failure mode
//! (timeout, transport error, non-2xx, unparseable body) collapses into a
//! [`StageFailure`]; this client never errors past the pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::types::{ClassifierVerdict, StageFailure};
use crate::taxonomy::TransactionType;

/// Bound on a single classification call.
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    category: String,
    #[serde(rename = "type")]
    tx_type: String,
    confidence_category: Option<f64>,
    confidence_type: Option<f64>,
}

/// HTTP client for the local prediction endpoint.
#[derive(Clone)]
pub struct HttpClassifier {
    host: String,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(host: &str) -> Self {
        HttpClassifier {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from `CLASSIFIER_HOST`, or None when unset.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("CLASSIFIER_HOST").ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(&host))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `POST /predict` with the free-text description.
    pub async fn classify(&self, text: &str) -> Result<ClassifierVerdict, StageFailure> {
        let url = format!("{}/predict", self.host);

        let response = self
            .client
            .post(&url)
            .timeout(CLASSIFY_TIMEOUT)
            .json(&PredictRequest { text })
            .send()
            .await
            .map_err(|e| StageFailure::Unavailable(format!("classifier request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageFailure::Unavailable(format!(
                "classifier returned {}",
                status
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| StageFailure::Malformed(format!("classifier response: {}", e)))?;

        let tx_type = body
            .tx_type
            .parse::<TransactionType>()
            .map_err(|_| StageFailure::Malformed(format!("unknown type: {}", body.tx_type)))?;

        debug!(
            category = %body.category,
            tx_type = %tx_type,
            "local classifier verdict"
        );

        Ok(ClassifierVerdict {
            category: body.category,
            tx_type,
            category_confidence: body.confidence_category,
            type_confidence: body.confidence_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockHttpServer;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_classify_success() {
        let server = MockHttpServer::json(
            StatusCode::OK,
            json!({
                "category": "food",
                "type": "EXPENSE",
                "confidence_category": 0.82,
                "confidence_type": 0.91
            }),
        )
        .await;

        let classifier = HttpClassifier::new(&server.url);
        let verdict = classifier.classify("Lunch at Kaldi's").await.unwrap();
        assert_eq!(verdict.category, "food");
        assert_eq!(verdict.tx_type, TransactionType::Expense);
        assert_eq!(verdict.category_confidence, Some(0.82));
        assert_eq!(verdict.type_confidence, Some(0.91));
    }

    #[tokio::test]
    async fn test_classify_missing_confidences() {
        let server = MockHttpServer::json(
            StatusCode::OK,
            json!({"category": "travel", "type": "expense"}),
        )
        .await;

        let classifier = HttpClassifier::new(&server.url);
        let verdict = classifier.classify("flight to Addis").await.unwrap();
        assert_eq!(verdict.category_confidence, None);
    }

    #[tokio::test]
    async fn test_classify_non_2xx_is_unavailable() {
        let server = MockHttpServer::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;

        let classifier = HttpClassifier::new(&server.url);
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, StageFailure::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_classify_malformed_body() {
        let server =
            MockHttpServer::json(StatusCode::OK, json!({"category": "food", "type": "maybe"}))
                .await;

        let classifier = HttpClassifier::new(&server.url);
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, StageFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn test_classify_unreachable_host() {
        // nothing listens here
        let classifier = HttpClassifier::new("http://127.0.0.1:1");
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, StageFailure::Unavailable(_)));
    }
}
