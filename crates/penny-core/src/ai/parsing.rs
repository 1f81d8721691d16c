//! Response parsing for model output
//!
//! Models are asked for strict JSON but routinely wrap it in Markdown fences
//! or prose. Everything here is defensive string work: strip the wrapping,
//! find the outermost object, then validate the fields we need.

use chrono::NaiveDate;
use serde_json::Value;

use crate::ai::types::{CategoryJudgment, ReceiptExtraction};
use crate::taxonomy::TransactionType;

/// Strip Markdown code fences (``` or ```json) from a model response.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the optional language tag on the opening fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Extract and parse the outermost JSON object from a model response.
pub fn extract_json(text: &str) -> Result<Value, String> {
    let cleaned = strip_fences(text);

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(format!("no JSON object in response: {}", truncate(cleaned))),
    };

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| format!("invalid JSON: {} in {}", e, truncate(cleaned)))
}

/// Parse a categorization response: `{"category", "type", "confidence"?}`.
///
/// Missing `category` or `type` is a parse failure; the category string is
/// returned raw, normalization happens at the pipeline boundary.
pub fn parse_category_judgment(text: &str) -> Result<CategoryJudgment, String> {
    let value = extract_json(text)?;

    let category = value
        .get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| format!("missing category in {}", truncate(text)))?
        .to_string();

    let tx_type = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(|t| t.parse::<TransactionType>().ok())
        .ok_or_else(|| format!("missing or invalid type in {}", truncate(text)))?;

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0));

    Ok(CategoryJudgment {
        category,
        tx_type,
        confidence,
    })
}

/// Parse a receipt extraction response:
/// `{"amount", "date", "description", "merchant_name"}`, each nullable.
///
/// An all-null object is a valid parse; it is the model's explicit
/// "not a receipt" signal, handled downstream.
pub fn parse_receipt_extraction(text: &str) -> Result<ReceiptExtraction, String> {
    let value = extract_json(text)?;

    // negative amounts are model noise, not refunds; drop them
    let amount = value
        .get("amount")
        .and_then(Value::as_f64)
        .filter(|a| *a >= 0.0);

    let date = value
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_receipt_date);

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let merchant_name = value
        .get("merchant_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    Ok(ReceiptExtraction {
        amount,
        date,
        description,
        merchant_name,
    })
}

/// Parse the date formats receipts actually come back with.
fn parse_receipt_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // ISO first, then common printed-receipt formats
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%m-%Y"))
        .ok()
}

/// Truncate a response for inclusion in an error message.
fn truncate(text: &str) -> String {
    const MAX: usize = 200;
    if text.len() <= MAX {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    }
}
