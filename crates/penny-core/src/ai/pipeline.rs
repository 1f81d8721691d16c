//! The two-stage categorization pipeline
//!
//! Every entry point funnels through [`CategorizationPipeline::finalize`]:
//! manual transaction saves, the free-text predict endpoint, and receipt
//! post-processing. Stage 1 asks the local classifier for a candidate; stage
//! 2 always runs the LLM, verifying the candidate when one exists and
//! classifying from scratch otherwise. The LLM's answer wins unconditionally.
//! When the LLM fails, a surviving candidate becomes final; with nothing
//! left, the neutral default closes the invocation. The pipeline cannot fail:
//! categorization outages must never block transaction entry.
//!
//! Each stage runs at most once per invocation; there are no retries.

use chrono::Utc;
use tracing::debug;

use crate::ai::types::{
    CategoryPrediction, ClassifierVerdict, PredictionOrigin, ScannedReceipt,
};
use crate::ai::{ClassifierBackend, ClassifierClient, LlmBackend, LlmClient};
use crate::error::ScanError;
use crate::taxonomy::Category;

/// Confidence assigned when the winning stage did not report one.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Merchant name used when extraction could not read one.
const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

/// Stateless pipeline over injected clients. Clone-able and shared across
/// concurrent requests.
#[derive(Clone)]
pub struct CategorizationPipeline {
    classifier: Option<ClassifierClient>,
    llm: Option<LlmClient>,
}

impl CategorizationPipeline {
    pub fn new(classifier: Option<ClassifierClient>, llm: Option<LlmClient>) -> Self {
        CategorizationPipeline { classifier, llm }
    }

    /// Build from the environment. Either client may be absent; the pipeline
    /// degrades rather than erroring.
    pub fn from_env() -> Self {
        Self::new(ClassifierClient::from_env(), LlmClient::from_env())
    }

    /// True when receipt scanning can work at all.
    pub fn supports_receipts(&self) -> bool {
        self.llm.is_some()
    }

    /// Produce the final categorization for a description.
    ///
    /// Normalization is applied exactly once, here, regardless of which
    /// stage produced the raw label.
    pub async fn finalize(&self, description: &str) -> CategoryPrediction {
        let candidate = match &self.classifier {
            Some(classifier) => match classifier.classify(description).await {
                Ok(verdict) => Some(verdict),
                Err(failure) => {
                    debug!(%failure, "local classifier produced no candidate");
                    None
                }
            },
            None => None,
        };

        let llm_result = match &self.llm {
            Some(llm) => llm.categorize(description, candidate.as_ref()).await,
            None => Err(crate::ai::StageFailure::Unavailable(
                "no llm configured".to_string(),
            )),
        };

        match llm_result {
            Ok(judgment) => {
                let origin = if candidate.is_some() {
                    PredictionOrigin::LlmVerified
                } else {
                    PredictionOrigin::LlmFallback
                };
                let confidence = judgment.confidence.unwrap_or(DEFAULT_CONFIDENCE);
                CategoryPrediction {
                    category: Category::normalize(&judgment.category),
                    tx_type: judgment.tx_type,
                    category_confidence: confidence,
                    type_confidence: confidence,
                    origin,
                }
            }
            Err(failure) => {
                debug!(%failure, "llm stage failed, degrading");
                match candidate {
                    Some(verdict) => finalize_candidate(verdict),
                    None => CategoryPrediction::neutral_default(),
                }
            }
        }
    }

    /// Scan a receipt image: vision extraction, usability gating, then the
    /// description alone goes through `finalize`.
    ///
    /// Amount, date, and merchant come only from extraction; category and
    /// type come only from the pipeline. The stages never cross-contaminate.
    pub async fn scan_receipt(
        &self,
        image: &[u8],
        mime: &str,
    ) -> Result<ScannedReceipt, ScanError> {
        let llm = self.llm.as_ref().ok_or(ScanError::MissingApiKey)?;

        let extraction = llm.extract_receipt(image, mime).await?;
        if extraction.is_blank() {
            return Err(ScanError::NotAReceipt);
        }

        // usability gate: amount present (zero counts) and a real description
        let amount = extraction.amount.ok_or(ScanError::MissingAmount)?;
        let description = extraction
            .usable_description()
            .ok_or(ScanError::MissingDescription)?
            .to_string();

        let prediction = self.finalize(&description).await;

        Ok(ScannedReceipt {
            amount,
            date: extraction.date.unwrap_or_else(|| Utc::now().date_naive()),
            description,
            merchant_name: extraction
                .merchant_name
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            prediction,
        })
    }
}

/// An orphaned local verdict becomes final as-is, normalized, with
/// confidences defaulted only where absent.
fn finalize_candidate(verdict: ClassifierVerdict) -> CategoryPrediction {
    CategoryPrediction {
        category: Category::normalize(&verdict.category),
        tx_type: verdict.tx_type,
        category_confidence: verdict.category_confidence.unwrap_or(DEFAULT_CONFIDENCE),
        type_confidence: verdict.type_confidence.unwrap_or(DEFAULT_CONFIDENCE),
        origin: PredictionOrigin::LocalClassifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{CategoryJudgment, ReceiptExtraction};
    use crate::ai::{MockClassifier, MockLlm};
    use crate::taxonomy::TransactionType;
    use chrono::NaiveDate;

    fn pipeline(classifier: Option<MockClassifier>, llm: Option<MockLlm>) -> CategorizationPipeline {
        CategorizationPipeline::new(
            classifier.map(ClassifierClient::Mock),
            llm.map(LlmClient::Mock),
        )
    }

    fn verdict(category: &str, tx_type: TransactionType) -> ClassifierVerdict {
        ClassifierVerdict {
            category: category.to_string(),
            tx_type,
            category_confidence: None,
            type_confidence: None,
        }
    }

    #[tokio::test]
    async fn test_category_always_in_taxonomy() {
        // raw labels the taxonomy has never heard of still normalize
        for raw in ["Food", "FOOD  ", "gifts and donation", "blockchain stuff", ""] {
            let p = pipeline(
                None,
                Some(MockLlm::fixed(CategoryJudgment {
                    category: raw.to_string(),
                    tx_type: TransactionType::Expense,
                    confidence: Some(0.7),
                })),
            );
            let result = p.finalize("whatever").await;
            assert!(
                Category::ALL.contains(&result.category),
                "raw label {:?} escaped normalization",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_terminal_fallback_when_everything_is_down() {
        let p = pipeline(Some(MockClassifier::unavailable()), Some(MockLlm::unavailable()));
        let result = p.finalize("anything").await;
        assert_eq!(result.category, Category::OtherExpense);
        assert_eq!(result.tx_type, TransactionType::Expense);
        assert_eq!(result.category_confidence, 0.3);
        assert_eq!(result.type_confidence, 0.3);
        assert_eq!(result.origin, PredictionOrigin::NeutralDefault);
    }

    #[tokio::test]
    async fn test_no_clients_configured_hits_terminal_fallback() {
        let p = pipeline(None, None);
        let result = p.finalize("anything").await;
        assert_eq!(result, CategoryPrediction::neutral_default());
    }

    #[tokio::test]
    async fn test_llm_overrides_local_guess() {
        // no confidence comparison gates the override
        let p = pipeline(
            Some(MockClassifier::returning(verdict(
                "other-expense",
                TransactionType::Expense,
            ))),
            Some(MockLlm::fixed(CategoryJudgment {
                category: "food".to_string(),
                tx_type: TransactionType::Expense,
                confidence: Some(0.4),
            })),
        );
        let result = p.finalize("Lunch at Kaldi's").await;
        assert_eq!(result.category, Category::Food);
        assert_eq!(result.origin, PredictionOrigin::LlmVerified);
    }

    #[tokio::test]
    async fn test_llm_down_degrades_to_local_prediction() {
        let p = pipeline(
            Some(MockClassifier::returning(ClassifierVerdict {
                category: "travel".to_string(),
                tx_type: TransactionType::Expense,
                category_confidence: Some(0.8),
                type_confidence: None,
            })),
            Some(MockLlm::unavailable()),
        );
        let result = p.finalize("flight to Addis").await;
        assert_eq!(result.category, Category::Travel);
        assert_eq!(result.tx_type, TransactionType::Expense);
        // reported confidence survives; only the absent one is defaulted
        assert_eq!(result.category_confidence, 0.8);
        assert_eq!(result.type_confidence, 0.5);
        assert_eq!(result.origin, PredictionOrigin::LocalClassifier);
    }

    #[tokio::test]
    async fn test_lunch_scenario_confirmed_by_llm() {
        let p = pipeline(
            Some(MockClassifier::returning(ClassifierVerdict {
                category: "food".to_string(),
                tx_type: TransactionType::Expense,
                category_confidence: Some(0.82),
                type_confidence: Some(0.91),
            })),
            Some(MockLlm::confirming()),
        );
        let result = p.finalize("Lunch at Kaldi's 850 birr").await;
        assert_eq!(result.category, Category::Food);
        assert_eq!(result.tx_type, TransactionType::Expense);
        assert_eq!(result.origin, PredictionOrigin::LlmVerified);
    }

    #[tokio::test]
    async fn test_llm_synonym_label_normalizes() {
        let p = pipeline(
            None,
            Some(MockLlm::fixed(CategoryJudgment {
                category: "gifts and donation".to_string(),
                tx_type: TransactionType::Expense,
                confidence: Some(0.9),
            })),
        );
        let result = p.finalize("wedding present").await;
        assert_eq!(result.category, Category::Gifts);
    }

    #[tokio::test]
    async fn test_llm_fallback_origin_without_classifier() {
        let p = pipeline(
            Some(MockClassifier::unavailable()),
            Some(MockLlm::fixed(CategoryJudgment {
                category: "salary".to_string(),
                tx_type: TransactionType::Income,
                confidence: None,
            })),
        );
        let result = p.finalize("June payroll").await;
        assert_eq!(result.category, Category::Salary);
        assert_eq!(result.tx_type, TransactionType::Income);
        assert_eq!(result.category_confidence, 0.5);
        assert_eq!(result.origin, PredictionOrigin::LlmFallback);
    }

    fn receipt_llm(extraction: ReceiptExtraction) -> MockLlm {
        MockLlm::fixed(CategoryJudgment {
            category: "food".to_string(),
            tx_type: TransactionType::Expense,
            confidence: Some(0.9),
        })
        .with_extraction(extraction)
    }

    #[tokio::test]
    async fn test_receipt_missing_amount_rejected_before_categorization() {
        let p = pipeline(
            None,
            Some(receipt_llm(ReceiptExtraction {
                amount: None,
                description: Some("Lunch".to_string()),
                ..Default::default()
            })),
        );
        let err = p.scan_receipt(b"img", "image/png").await.unwrap_err();
        assert!(matches!(err, ScanError::MissingAmount));
    }

    #[tokio::test]
    async fn test_receipt_zero_amount_accepted() {
        let p = pipeline(
            None,
            Some(receipt_llm(ReceiptExtraction {
                amount: Some(0.0),
                description: Some("Comped lunch".to_string()),
                date: NaiveDate::from_ymd_opt(2024, 6, 2),
                merchant_name: Some("Kaldi's".to_string()),
            })),
        );
        let receipt = p.scan_receipt(b"img", "image/png").await.unwrap();
        assert_eq!(receipt.amount, 0.0);
        assert_eq!(receipt.prediction.category, Category::Food);
    }

    #[tokio::test]
    async fn test_receipt_blank_description_rejected() {
        let p = pipeline(
            None,
            Some(receipt_llm(ReceiptExtraction {
                amount: Some(10.0),
                description: Some("   ".to_string()),
                ..Default::default()
            })),
        );
        let err = p.scan_receipt(b"img", "image/png").await.unwrap_err();
        assert!(matches!(err, ScanError::MissingDescription));
    }

    #[tokio::test]
    async fn test_receipt_all_null_is_not_a_receipt() {
        let p = pipeline(None, Some(receipt_llm(ReceiptExtraction::default())));
        let err = p.scan_receipt(b"img", "image/png").await.unwrap_err();
        assert!(matches!(err, ScanError::NotAReceipt));
    }

    #[tokio::test]
    async fn test_receipt_defaults_date_and_merchant() {
        let p = pipeline(
            None,
            Some(receipt_llm(ReceiptExtraction {
                amount: Some(25.0),
                description: Some("Groceries".to_string()),
                date: None,
                merchant_name: None,
            })),
        );
        let receipt = p.scan_receipt(b"img", "image/png").await.unwrap();
        assert_eq!(receipt.merchant_name, "Unknown Merchant");
        assert_eq!(receipt.date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_receipt_without_llm_reports_missing_credentials() {
        let p = pipeline(None, None);
        let err = p.scan_receipt(b"img", "image/png").await.unwrap_err();
        assert!(matches!(err, ScanError::MissingApiKey));
    }
}
