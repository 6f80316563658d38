//! Domain models for Vigil

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Label used for transactions without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A user whose transactions are scanned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A stored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    /// Raw bank description
    pub description: String,
    /// Positive = debit/outflow, negative = credit/inflow
    pub amount: f64,
    pub category: Option<String>,
    /// Clean merchant name, when the source provides one
    pub merchant_name: Option<String>,
    /// Hash for deduplication
    pub import_hash: String,

    // Review state
    pub is_reviewed: bool,
    /// None until reviewed; Some(false) means the user marked it suspicious
    pub is_legitimate: Option<bool>,
    pub review_feedback: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,

    // Anomaly state
    pub is_anomaly: bool,
    pub anomaly_explanation: Option<String>,
    pub anomaly_data: Option<AnomalyData>,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Category label used for statistics, with blanks folded into "Uncategorized"
    pub fn category_label(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }

    /// Name shown to the user and embedded in prompts
    pub fn display_name(&self) -> &str {
        match self.merchant_name.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m,
            _ => self.description.trim(),
        }
    }
}

/// A new transaction to be imported (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub merchant_name: Option<String>,
    pub import_hash: String,
}

/// Why a transaction was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    /// Amount is far from the user's overall mean
    Amount,
    /// Amount is far from the mean of its own category
    CategoryAmount,
    /// Category makes up a small share of the window
    RareCategory,
    /// Category has no history in the window
    NewCategory,
}

impl AnomalyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::CategoryAmount => "category_amount",
            Self::RareCategory => "rare_category",
            Self::NewCategory => "new_category",
        }
    }
}

impl std::str::FromStr for AnomalyReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "amount" => Ok(Self::Amount),
            "category_amount" => Ok(Self::CategoryAmount),
            "rare_category" => Ok(Self::RareCategory),
            "new_category" => Ok(Self::NewCategory),
            _ => Err(format!("Unknown anomaly reason: {}", s)),
        }
    }
}

impl std::fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted summary of a detection hit (stored as JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyData {
    pub reasons: Vec<AnomalyReason>,
    pub score: f64,
    pub detected_at: DateTime<Utc>,
}

/// A transaction flagged during a detection run
#[derive(Debug, Clone)]
pub struct AnomalyCandidate {
    pub transaction: Transaction,
    /// Reasons in the order the rules fired
    pub reasons: Vec<AnomalyReason>,
    /// Sum of rule contributions
    pub score: f64,
}

impl AnomalyCandidate {
    /// Reason tags joined for prompts and display, e.g. "amount, rare_category"
    pub fn reasons_joined(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_reason(&self, reason: AnomalyReason) -> bool {
        self.reasons.contains(&reason)
    }

    /// Explanation attached by the orchestrator (empty before explanation)
    pub fn explanation(&self) -> &str {
        self.transaction
            .anomaly_explanation
            .as_deref()
            .unwrap_or_default()
    }
}
