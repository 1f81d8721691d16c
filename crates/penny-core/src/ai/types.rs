//! Value objects exchanged between the categorization stages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::taxonomy::{Category, TransactionType};

/// Why a stage produced nothing usable.
///
/// Both variants route into the same fallthrough branch in the pipeline;
/// they are kept distinct for logging and tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageFailure {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Which pipeline stage produced the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictionOrigin {
    LocalClassifier,
    LlmVerified,
    LlmFallback,
    NeutralDefault,
}

/// The finalized output of the categorization pipeline.
///
/// `category` is always taxonomy-normalized; callers never see a raw model
/// label. Not persisted on the transaction itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub category: Category,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category_confidence: f64,
    pub type_confidence: f64,
    pub origin: PredictionOrigin,
}

impl CategoryPrediction {
    /// The terminal fallback of the whole pipeline. Pure in-process value,
    /// no network call, always available.
    pub fn neutral_default() -> Self {
        CategoryPrediction {
            category: Category::OtherExpense,
            tx_type: TransactionType::Expense,
            category_confidence: 0.3,
            type_confidence: 0.3,
            origin: PredictionOrigin::NeutralDefault,
        }
    }
}

/// Raw output of the local classifier. The category label is unnormalized;
/// confidences may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierVerdict {
    pub category: String,
    pub tx_type: TransactionType,
    pub category_confidence: Option<f64>,
    pub type_confidence: Option<f64>,
}

/// Raw output of the LLM categorizer, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryJudgment {
    pub category: String,
    pub tx_type: TransactionType,
    pub confidence: Option<f64>,
}

/// Structured guess extracted from a receipt image by the vision model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptExtraction {
    /// Non-negative when present. Zero is a valid amount.
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub merchant_name: Option<String>,
}

impl ReceiptExtraction {
    /// True when every field is null, the model's "I can't read this" shape.
    pub fn is_blank(&self) -> bool {
        self.amount.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.merchant_name.is_none()
    }

    /// The description if it is non-empty after trimming.
    pub fn usable_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// A validated receipt: extraction fields plus the pipeline's categorization.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedReceipt {
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
    pub merchant_name: String,
    pub prediction: CategoryPrediction,
}
