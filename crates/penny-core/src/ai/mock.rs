//! Mock classifier and LLM backends for tests

use crate::ai::types::{
    CategoryJudgment, ClassifierVerdict, ReceiptExtraction, StageFailure,
};
use crate::error::ScanError;

/// Scripted local classifier.
#[derive(Clone)]
pub struct MockClassifier {
    verdict: Option<ClassifierVerdict>,
}

impl MockClassifier {
    /// Always returns the given verdict.
    pub fn returning(verdict: ClassifierVerdict) -> Self {
        MockClassifier {
            verdict: Some(verdict),
        }
    }

    /// Always reports the prediction service as down.
    pub fn unavailable() -> Self {
        MockClassifier { verdict: None }
    }

    pub async fn classify(&self, _text: &str) -> Result<ClassifierVerdict, StageFailure> {
        self.verdict
            .clone()
            .ok_or_else(|| StageFailure::Unavailable("mock classifier down".to_string()))
    }
}

#[derive(Clone)]
enum LlmScript {
    /// Always returns this judgment, ignoring any candidate.
    Fixed(CategoryJudgment),
    /// Echoes the candidate back as confirmed; unavailable without one.
    ConfirmCandidate,
    /// Always fails.
    Unavailable,
}

/// Scripted LLM for pipeline tests. Text behavior and receipt extraction are
/// configured independently.
#[derive(Clone)]
pub struct MockLlm {
    script: LlmScript,
    extraction: Option<ReceiptExtraction>,
}

impl MockLlm {
    pub fn fixed(judgment: CategoryJudgment) -> Self {
        MockLlm {
            script: LlmScript::Fixed(judgment),
            extraction: None,
        }
    }

    pub fn confirming() -> Self {
        MockLlm {
            script: LlmScript::ConfirmCandidate,
            extraction: None,
        }
    }

    pub fn unavailable() -> Self {
        MockLlm {
            script: LlmScript::Unavailable,
            extraction: None,
        }
    }

    /// Set what `extract_receipt` returns.
    pub fn with_extraction(mut self, extraction: ReceiptExtraction) -> Self {
        self.extraction = Some(extraction);
        self
    }

    pub async fn categorize(
        &self,
        _description: &str,
        candidate: Option<&ClassifierVerdict>,
    ) -> Result<CategoryJudgment, StageFailure> {
        match &self.script {
            LlmScript::Fixed(judgment) => Ok(judgment.clone()),
            LlmScript::ConfirmCandidate => candidate
                .map(|c| CategoryJudgment {
                    category: c.category.clone(),
                    tx_type: c.tx_type,
                    confidence: c.category_confidence.or(Some(0.9)),
                })
                .ok_or_else(|| StageFailure::Unavailable("nothing to confirm".to_string())),
            LlmScript::Unavailable => {
                Err(StageFailure::Unavailable("mock llm down".to_string()))
            }
        }
    }

    pub async fn extract_receipt(
        &self,
        _image: &[u8],
        _mime: &str,
    ) -> Result<ReceiptExtraction, ScanError> {
        self.extraction.clone().ok_or(ScanError::ModelUnavailable)
    }
}
