//! Transaction store seam used by the detector
//!
//! The detector only needs four operations from storage. `Database` is the
//! production implementation; tests swap in stores that fail on purpose.

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::{AnomalyData, Transaction};

/// Storage operations consumed by anomaly detection
pub trait TransactionStore: Send + Sync {
    /// A user's transactions dated on or after `since`, newest first
    fn fetch_by_user_since(&self, user_id: i64, since: NaiveDate) -> Result<Vec<Transaction>>;

    /// Flag a transaction and store its explanation and detection data
    fn persist_anomaly(
        &self,
        transaction_id: i64,
        explanation: &str,
        data: &AnomalyData,
    ) -> Result<()>;

    /// Record review state. Unknown IDs are `Error::NotFound`.
    fn review_transaction(
        &self,
        transaction_id: i64,
        is_legitimate: bool,
        feedback: Option<&str>,
    ) -> Result<()>;

    /// Flagged transactions that have not been reviewed yet
    fn list_anomalies(&self, user_id: i64) -> Result<Vec<Transaction>>;
}

impl TransactionStore for Database {
    fn fetch_by_user_since(&self, user_id: i64, since: NaiveDate) -> Result<Vec<Transaction>> {
        self.list_transactions_since(user_id, since)
    }

    fn persist_anomaly(
        &self,
        transaction_id: i64,
        explanation: &str,
        data: &AnomalyData,
    ) -> Result<()> {
        self.mark_anomaly(transaction_id, explanation, data)
    }

    fn review_transaction(
        &self,
        transaction_id: i64,
        is_legitimate: bool,
        feedback: Option<&str>,
    ) -> Result<()> {
        self.set_review(transaction_id, is_legitimate, feedback)
    }

    fn list_anomalies(&self, user_id: i64) -> Result<Vec<Transaction>> {
        self.list_unreviewed_anomalies(user_id)
    }
}
