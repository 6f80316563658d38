//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use super::{now_string, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AnomalyData, NewTransaction, Transaction};

/// Result of inserting a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionInsertResult {
    /// Transaction was inserted, contains new transaction ID
    Inserted(i64),
    /// Transaction was a duplicate, contains existing transaction ID
    Duplicate(i64),
}

const TRANSACTION_COLUMNS: &str = "id, user_id, date, description, amount, category, merchant_name,
    import_hash, is_reviewed, is_legitimate, review_feedback, reviewed_at,
    is_anomaly, anomaly_explanation, anomaly_data, created_at";

impl Database {
    /// Insert a transaction for a user (skips duplicates based on import_hash)
    pub fn insert_transaction(
        &self,
        user_id: i64,
        tx: &NewTransaction,
    ) -> Result<TransactionInsertResult> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE user_id = ? AND import_hash = ?",
                params![user_id, tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            return Ok(TransactionInsertResult::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, date, description, amount, category, merchant_name, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.category,
                tx.merchant_name,
                tx.import_hash,
            ],
        )?;

        Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// Transactions for a user dated on or after `since`, newest first
    pub fn list_transactions_since(
        &self,
        user_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions
             WHERE user_id = ? AND date >= ?
             ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, since.to_string()], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Flagged transactions awaiting review, newest first
    pub fn list_unreviewed_anomalies(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions
             WHERE user_id = ? AND is_anomaly = 1 AND is_reviewed = 0
             ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Count a user's transactions
    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mark a transaction as an anomaly with its explanation and detection data
    pub fn mark_anomaly(&self, id: i64, explanation: &str, data: &AnomalyData) -> Result<()> {
        let data_json = serde_json::to_string(data)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions
             SET is_anomaly = 1, anomaly_explanation = ?, anomaly_data = ?
             WHERE id = ?",
            params![explanation, data_json, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    /// Record the user's review of a transaction
    pub fn set_review(&self, id: i64, is_legitimate: bool, feedback: Option<&str>) -> Result<()> {
        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions
             SET is_reviewed = 1, is_legitimate = ?, review_feedback = ?, reviewed_at = ?
             WHERE id = ?",
            params![is_legitimate, feedback, now_string(), id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let id: i64 = row.get(0)?;
        let date_str: String = row.get(2)?;
        let reviewed_at: Option<String> = row.get(11)?;
        let anomaly_json: Option<String> = row.get(14)?;
        let created_at: String = row.get(15)?;

        // Corrupt anomaly_data is logged and read as None
        let anomaly_data = anomaly_json.and_then(|json| {
            serde_json::from_str::<AnomalyData>(&json)
                .map_err(|e| warn!(transaction_id = id, error = %e, "Unreadable anomaly_data"))
                .ok()
        });

        Ok(Transaction {
            id,
            user_id: row.get(1)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            description: row.get(3)?,
            amount: row.get(4)?,
            category: row.get(5)?,
            merchant_name: row.get(6)?,
            import_hash: row.get(7)?,
            is_reviewed: row.get(8)?,
            is_legitimate: row.get(9)?,
            review_feedback: row.get(10)?,
            reviewed_at: reviewed_at.as_deref().map(parse_datetime),
            is_anomaly: row.get(12)?,
            anomaly_explanation: row.get(13)?,
            anomaly_data,
            created_at: parse_datetime(&created_at),
        })
    }
}
