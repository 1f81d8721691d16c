//! Categorization clients and pipeline
//!
//! Two external model surfaces feed the pipeline:
//!
//! - `ClassifierClient`: the local prediction service (fast, optional)
//! - `LlmClient`: the generative model used for verification, fallback
//!   categorization, and receipt vision
//!
//! Both are enum wrappers over backend implementations, giving Clone and
//! compile-time dispatch without `Box<dyn>`. Mocks plug in through the same
//! wrappers so the pipeline under test is the pipeline in production.
//!
//! # Configuration
//!
//! - `CLASSIFIER_HOST`: local prediction service URL (optional)
//! - `GEMINI_API_KEY`: Gemini credentials (optional; pipeline degrades)
//! - `GEMINI_HOST`, `GEMINI_MODEL`, `GEMINI_VISION_MODEL`: overrides

mod classifier;
mod gemini;
mod mock;
pub mod parsing;
pub mod pipeline;
pub mod types;

pub use classifier::{HttpClassifier, CLASSIFY_TIMEOUT};
pub use gemini::{GeminiBackend, TEXT_TIMEOUT, VISION_TIMEOUT};
pub use mock::{MockClassifier, MockLlm};
pub use pipeline::CategorizationPipeline;
pub use types::*;

use async_trait::async_trait;

use crate::error::ScanError;

/// Interface to the local prediction service.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassifierVerdict, StageFailure>;
}

/// Interface to the generative model.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Categorize a description, verifying `candidate` when one is supplied.
    async fn categorize(
        &self,
        description: &str,
        candidate: Option<&ClassifierVerdict>,
    ) -> Result<CategoryJudgment, StageFailure>;

    /// Extract structured fields from a receipt image.
    async fn extract_receipt(
        &self,
        image: &[u8],
        mime: &str,
    ) -> Result<ReceiptExtraction, ScanError>;
}

/// Concrete classifier client enum.
#[derive(Clone)]
pub enum ClassifierClient {
    Http(HttpClassifier),
    Mock(MockClassifier),
}

impl ClassifierClient {
    /// Create from `CLASSIFIER_HOST`, or None when unset.
    pub fn from_env() -> Option<Self> {
        HttpClassifier::from_env().map(ClassifierClient::Http)
    }
}

#[async_trait]
impl ClassifierBackend for ClassifierClient {
    async fn classify(&self, text: &str) -> Result<ClassifierVerdict, StageFailure> {
        match self {
            ClassifierClient::Http(b) => b.classify(text).await,
            ClassifierClient::Mock(b) => b.classify(text).await,
        }
    }
}

/// Concrete LLM client enum.
#[derive(Clone)]
pub enum LlmClient {
    Gemini(GeminiBackend),
    Mock(MockLlm),
}

impl LlmClient {
    /// Create from `GEMINI_API_KEY` and friends, or None when unconfigured.
    pub fn from_env() -> Option<Self> {
        GeminiBackend::from_env().map(LlmClient::Gemini)
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn categorize(
        &self,
        description: &str,
        candidate: Option<&ClassifierVerdict>,
    ) -> Result<CategoryJudgment, StageFailure> {
        match self {
            LlmClient::Gemini(b) => b.categorize(description, candidate).await,
            LlmClient::Mock(b) => b.categorize(description, candidate).await,
        }
    }

    async fn extract_receipt(
        &self,
        image: &[u8],
        mime: &str,
    ) -> Result<ReceiptExtraction, ScanError> {
        match self {
            LlmClient::Gemini(b) => b.extract_receipt(image, mime).await,
            LlmClient::Mock(b) => b.extract_receipt(image, mime).await,
        }
    }
}
