//! The fixed category taxonomy and transaction types
//!
//! Every category label that leaves this crate is one of the canonical
//! variants below. Raw labels from upstream models go through
//! [`Category::normalize`] exactly once, at the pipeline boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical transaction categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Food,
    Transportation,
    Shopping,
    Entertainment,
    Bills,
    Utilities,
    Healthcare,
    Education,
    Travel,
    Groceries,
    Housing,
    Insurance,
    Gifts,
    Salary,
    Freelance,
    Rental,
    Investments,
    Business,
    OtherIncome,
    OtherExpense,
}

impl Category {
    /// All canonical categories, in taxonomy order.
    pub const ALL: [Category; 20] = [
        Category::Food,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::Bills,
        Category::Utilities,
        Category::Healthcare,
        Category::Education,
        Category::Travel,
        Category::Groceries,
        Category::Housing,
        Category::Insurance,
        Category::Gifts,
        Category::Salary,
        Category::Freelance,
        Category::Rental,
        Category::Investments,
        Category::Business,
        Category::OtherIncome,
        Category::OtherExpense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transportation => "transportation",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Bills => "bills",
            Category::Utilities => "utilities",
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Travel => "travel",
            Category::Groceries => "groceries",
            Category::Housing => "housing",
            Category::Insurance => "insurance",
            Category::Gifts => "gifts",
            Category::Salary => "salary",
            Category::Freelance => "freelance",
            Category::Rental => "rental",
            Category::Investments => "investments",
            Category::Business => "business",
            Category::OtherIncome => "other-income",
            Category::OtherExpense => "other-expense",
        }
    }

    /// Normalize a raw model-produced label into a canonical category.
    ///
    /// Trims, lower-cases, tolerates underscores/extra whitespace, and maps
    /// known synonym labels. Anything unrecognized falls back to
    /// `other-expense`. This is the single normalization point; call sites
    /// must not do their own string comparison.
    pub fn normalize(raw: &str) -> Category {
        let cleaned = raw.trim().to_lowercase().replace(['_', '-'], " ");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        match cleaned.as_str() {
            "gifts and donation" | "gifts and donations" | "gift" | "donation" | "donations" => {
                Category::Gifts
            }
            "other income" => Category::OtherIncome,
            "other expense" | "other" | "miscellaneous" | "misc" => Category::OtherExpense,
            other => other
                .replace(' ', "-")
                .parse()
                .unwrap_or(Category::OtherExpense),
        }
    }

    /// The bucket a category aggregates into for budgets and reports.
    ///
    /// `bills` folds into `utilities`; everything else reports as itself.
    pub fn reporting_bucket(&self) -> Category {
        match self {
            Category::Bills => Category::Utilities,
            other => *other,
        }
    }

    /// Whether the category is an income category.
    pub fn is_income(&self) -> bool {
        matches!(
            self,
            Category::Salary
                | Category::Freelance
                | Category::Rental
                | Category::Investments
                | Category::Business
                | Category::OtherIncome
        )
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }

    /// The signed balance delta for an amount of this type.
    ///
    /// Income is positive, expense is negative. Amounts are stored
    /// non-negative; all sign handling goes through here.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            TransactionType::Income => amount,
            TransactionType::Expense => -amount,
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
