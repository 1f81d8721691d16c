//! Gemini backend for text categorization and receipt vision
//!
//! Talks to the generateContent REST API. Text calls feed the categorization
//! pipeline and fail soft into [`StageFailure`]; vision calls back the
//! receipt scan flow and surface the full [`ScanError`] taxonomy so the user
//! sees a specific message.

use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use crate::ai::parsing;
use crate::ai::types::{CategoryJudgment, ClassifierVerdict, ReceiptExtraction, StageFailure};
use crate::error::ScanError;
use crate::taxonomy::Category;

const DEFAULT_HOST: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_VISION_MODEL: &str = "gemini-2.0-flash";

/// Bound on a text categorization call. Kept tight so the interactive
/// predict path stays responsive.
pub const TEXT_TIMEOUT: Duration = Duration::from_secs(5);

/// Vision calls move image payloads and get a longer leash.
pub const VISION_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport- and API-level failure of a generateContent call, before it is
/// mapped into the caller's error vocabulary.
enum ApiFailure {
    Transport(String),
    Status(u16, String),
}

#[derive(Clone)]
pub struct GeminiBackend {
    api_key: String,
    host: String,
    model: String,
    vision_model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: &str, host: &str, model: &str, vision_model: &str) -> Self {
        GeminiBackend {
            api_key: api_key.to_string(),
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            vision_model: vision_model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables, or None when `GEMINI_API_KEY` is
    /// unset. A missing key is a degraded configuration, not an error.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        let host = std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let vision_model =
            std::env::var("GEMINI_VISION_MODEL").unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());
        Some(Self::new(&api_key, &host, &model, &vision_model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Categorize a description, optionally verifying a local candidate.
    pub async fn categorize(
        &self,
        description: &str,
        candidate: Option<&ClassifierVerdict>,
    ) -> Result<CategoryJudgment, StageFailure> {
        let prompt = match candidate {
            Some(c) => verification_prompt(description, c),
            None => fallback_prompt(description),
        };

        let parts = vec![json!({"text": prompt})];
        let text = self
            .generate(&self.model, parts, TEXT_TIMEOUT)
            .await
            .map_err(|f| match f {
                ApiFailure::Transport(msg) => StageFailure::Unavailable(msg),
                ApiFailure::Status(code, msg) => {
                    StageFailure::Unavailable(format!("gemini returned {}: {}", code, msg))
                }
            })?;

        parsing::parse_category_judgment(&text).map_err(StageFailure::Malformed)
    }

    /// Extract structured receipt fields from an image.
    pub async fn extract_receipt(
        &self,
        image: &[u8],
        mime: &str,
    ) -> Result<ReceiptExtraction, ScanError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let parts = vec![
            json!({"text": RECEIPT_PROMPT}),
            json!({"inline_data": {"mime_type": mime, "data": encoded}}),
        ];

        let text = self
            .generate(&self.vision_model, parts, VISION_TIMEOUT)
            .await
            .map_err(|f| match f {
                ApiFailure::Transport(msg) => ScanError::Api(msg),
                ApiFailure::Status(401 | 403, _) => ScanError::PermissionDenied,
                ApiFailure::Status(429, _) => ScanError::QuotaExceeded,
                ApiFailure::Status(404 | 503, _) => ScanError::ModelUnavailable,
                ApiFailure::Status(code, msg) => {
                    ScanError::Api(format!("gemini returned {}: {}", code, msg))
                }
            })?;

        parsing::parse_receipt_extraction(&text).map_err(ScanError::MalformedResponse)
    }

    /// One generateContent call, returning the first candidate's text.
    async fn generate(
        &self,
        model: &str,
        parts: Vec<Value>,
        timeout: Duration,
    ) -> Result<String, ApiFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.host, model, self.api_key
        );

        let body = json!({
            "contents": [{"parts": parts}],
            "generationConfig": {"temperature": 0.1}
        });

        debug!(model = %model, "gemini generateContent call");

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(format!("gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(ApiFailure::Status(status.as_u16(), detail));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ApiFailure::Transport(format!("gemini response body: {}", e)))?;

        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiFailure::Transport("gemini response had no candidate text".into()))
    }
}

fn taxonomy_list() -> String {
    Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn fallback_prompt(description: &str) -> String {
    format!(
        "Classify this financial transaction description into exactly one category \
         from this list: {taxonomy}.\n\
         Also decide whether it is INCOME or EXPENSE.\n\n\
         Description: \"{description}\"\n\n\
         Respond with strict JSON only, no prose:\n\
         {{\"category\": \"<category>\", \"type\": \"INCOME\" or \"EXPENSE\", \"confidence\": <0.0-1.0>}}",
        taxonomy = taxonomy_list(),
        description = description
    )
}

fn verification_prompt(description: &str, candidate: &ClassifierVerdict) -> String {
    format!(
        "A local model classified this financial transaction. Verify the classification.\n\n\
         Description: \"{description}\"\n\
         Candidate category: {category}\n\
         Candidate type: {tx_type}\n\n\
         If the candidate is correct, confirm it. If it is wrong or vague (for example a \
         generic \"other-expense\" when a more specific category applies), replace it with \
         the best category from this list: {taxonomy}.\n\n\
         Respond with strict JSON only, no prose:\n\
         {{\"category\": \"<category>\", \"type\": \"INCOME\" or \"EXPENSE\", \"confidence\": <0.0-1.0>}}",
        description = description,
        category = candidate.category,
        tx_type = candidate.tx_type,
        taxonomy = taxonomy_list()
    )
}

const RECEIPT_PROMPT: &str = "You are reading a photo of a purchase receipt. Extract these fields \
and respond with strict JSON only, no prose:\n\
{\"amount\": <total as a bare number>, \"date\": \"YYYY-MM-DD\", \
\"description\": \"<short summary of the purchase>\", \"merchant_name\": \"<merchant>\"}\n\
Use null for any field you cannot read. If the image is not a receipt at all, \
respond with all four fields set to null. Never guess a category and never invent values.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TransactionType;
    use crate::test_utils::{gemini_text_response, MockHttpServer};
    use axum::http::StatusCode;
    use serde_json::json;

    fn backend(url: &str) -> GeminiBackend {
        GeminiBackend::new("test-key", url, "test-model", "test-vision-model")
    }

    #[tokio::test]
    async fn test_categorize_parses_fenced_json() {
        let server = MockHttpServer::json(
            StatusCode::OK,
            gemini_text_response(
                "```json\n{\"category\": \"food\", \"type\": \"EXPENSE\", \"confidence\": 0.95}\n```",
            ),
        )
        .await;

        let judgment = backend(&server.url)
            .categorize("Lunch at Kaldi's", None)
            .await
            .unwrap();
        assert_eq!(judgment.category, "food");
        assert_eq!(judgment.tx_type, TransactionType::Expense);
        assert_eq!(judgment.confidence, Some(0.95));
    }

    #[tokio::test]
    async fn test_categorize_non_2xx_is_unavailable() {
        let server = MockHttpServer::json(StatusCode::TOO_MANY_REQUESTS, json!({})).await;

        let err = backend(&server.url)
            .categorize("anything", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StageFailure::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_categorize_prose_only_is_malformed() {
        let server = MockHttpServer::json(
            StatusCode::OK,
            gemini_text_response("I think this is probably food related."),
        )
        .await;

        let err = backend(&server.url)
            .categorize("anything", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StageFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn test_extract_receipt_status_mapping() {
        for (status, expect_quota, expect_permission, expect_unavailable) in [
            (StatusCode::UNAUTHORIZED, false, true, false),
            (StatusCode::FORBIDDEN, false, true, false),
            (StatusCode::TOO_MANY_REQUESTS, true, false, false),
            (StatusCode::NOT_FOUND, false, false, true),
            (StatusCode::SERVICE_UNAVAILABLE, false, false, true),
        ] {
            let server = MockHttpServer::json(status, json!({})).await;
            let err = backend(&server.url)
                .extract_receipt(b"img", "image/png")
                .await
                .unwrap_err();
            assert_eq!(matches!(err, ScanError::QuotaExceeded), expect_quota);
            assert_eq!(matches!(err, ScanError::PermissionDenied), expect_permission);
            assert_eq!(matches!(err, ScanError::ModelUnavailable), expect_unavailable);
        }
    }

    #[tokio::test]
    async fn test_extract_receipt_success() {
        let server = MockHttpServer::json(
            StatusCode::OK,
            gemini_text_response(
                "{\"amount\": 850, \"date\": \"2024-06-02\", \"description\": \"Lunch\", \"merchant_name\": \"Kaldi's\"}",
            ),
        )
        .await;

        let extraction = backend(&server.url)
            .extract_receipt(b"img", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(extraction.amount, Some(850.0));
        assert_eq!(extraction.merchant_name.as_deref(), Some("Kaldi's"));
    }

    #[test]
    fn test_from_env_requires_key() {
        // key handling is pure string logic; exercise the empty-string guard
        std::env::remove_var("GEMINI_API_KEY");
        assert!(GeminiBackend::from_env().is_none());
    }

    #[test]
    fn test_prompts_enumerate_taxonomy() {
        let prompt = fallback_prompt("coffee");
        for cat in Category::ALL {
            assert!(prompt.contains(cat.as_str()), "missing {}", cat);
        }
        assert!(prompt.contains("strict JSON"));
    }
}
