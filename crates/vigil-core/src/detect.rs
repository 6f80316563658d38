//! Anomaly detection orchestrator
//!
//! One run covers one user: fetch the lookback window, compute statistics,
//! score, explain each candidate, then persist the anomaly fields.
//! Explanation and persistence failures are absorbed per transaction;
//! fetch, statistics and scoring failures abort the run.

use chrono::{Duration, Local, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::config::DetectionConfig;
use crate::error::{Error, Result};
use crate::explain::{AiExplainer, ExplanationGenerator};
use crate::models::{AnomalyCandidate, AnomalyData};
use crate::score::{AnomalyScorer, ZScoreScorer};
use crate::stats::{StatisticsCalculator, WindowStatistics};
use crate::store::TransactionStore;

/// Public entry point for anomaly detection
pub struct AnomalyDetector<'a> {
    store: &'a dyn TransactionStore,
    statistics: Box<dyn StatisticsCalculator + 'a>,
    scorer: Box<dyn AnomalyScorer + 'a>,
    explainer: Box<dyn ExplanationGenerator + 'a>,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(
        store: &'a dyn TransactionStore,
        statistics: Box<dyn StatisticsCalculator + 'a>,
        scorer: Box<dyn AnomalyScorer + 'a>,
        explainer: Box<dyn ExplanationGenerator + 'a>,
    ) -> Self {
        Self {
            store,
            statistics,
            scorer,
            explainer,
        }
    }

    /// Standard pipeline: window statistics, z-score scorer, AI explainer
    pub fn with_defaults(
        store: &'a dyn TransactionStore,
        ai: Option<AIClient>,
        config: &DetectionConfig,
    ) -> Self {
        Self::new(
            store,
            Box::new(WindowStatistics),
            Box::new(ZScoreScorer::new(config.clone())),
            Box::new(AiExplainer::new(ai, config.explanation_timeout)),
        )
    }

    /// Scan the trailing window ending today. Failures yield an empty list.
    pub async fn detect_anomalies(
        &self,
        user_id: i64,
        lookback_days: i64,
    ) -> Vec<AnomalyCandidate> {
        self.detect_anomalies_as_of(user_id, lookback_days, today())
            .await
    }

    /// Scan the trailing window ending today, surfacing fetch/statistics errors
    pub async fn try_detect_anomalies(
        &self,
        user_id: i64,
        lookback_days: i64,
    ) -> Result<Vec<AnomalyCandidate>> {
        self.try_detect_anomalies_as_of(user_id, lookback_days, today())
            .await
    }

    /// Scan the window `[as_of - lookback_days, as_of]`. Failures yield an empty list.
    pub async fn detect_anomalies_as_of(
        &self,
        user_id: i64,
        lookback_days: i64,
        as_of: NaiveDate,
    ) -> Vec<AnomalyCandidate> {
        match self
            .try_detect_anomalies_as_of(user_id, lookback_days, as_of)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(user_id, error = %e, "Anomaly detection failed");
                Vec::new()
            }
        }
    }

    /// Scan the window `[as_of - lookback_days, as_of]`
    pub async fn try_detect_anomalies_as_of(
        &self,
        user_id: i64,
        lookback_days: i64,
        as_of: NaiveDate,
    ) -> Result<Vec<AnomalyCandidate>> {
        if lookback_days < 0 {
            return Err(Error::InvalidData(format!(
                "lookback must not be negative (got {} days)",
                lookback_days
            )));
        }

        let since = as_of - Duration::days(lookback_days);
        let transactions: Vec<_> = self
            .store
            .fetch_by_user_since(user_id, since)?
            .into_iter()
            .filter(|tx| tx.date <= as_of)
            .collect();

        if transactions.is_empty() {
            info!(user_id, %since, %as_of, "No transactions in window, skipping detection");
            return Ok(Vec::new());
        }

        let stats = self.statistics.calculate(&transactions)?;
        debug!(
            user_id,
            transactions = stats.transaction_count,
            mean = stats.amount.mean,
            std_dev = stats.amount.std_dev,
            categories = stats.categories.len(),
            "Computed window statistics"
        );

        let mut candidates = self.scorer.score(&transactions, &stats)?;

        for candidate in &mut candidates {
            let explanation = self.explainer.explain(candidate).await;
            let data = AnomalyData {
                reasons: candidate.reasons.clone(),
                score: candidate.score,
                detected_at: Utc::now(),
            };

            let transaction_id = candidate.transaction.id;
            if let Err(e) = self
                .store
                .persist_anomaly(transaction_id, &explanation, &data)
            {
                warn!(user_id, transaction_id, error = %e, "Failed to persist anomaly");
            }

            let tx = &mut candidate.transaction;
            tx.is_anomaly = true;
            tx.anomaly_explanation = Some(explanation);
            tx.anomaly_data = Some(data);
        }

        info!(
            user_id,
            transactions = transactions.len(),
            anomalies = candidates.len(),
            "Anomaly detection complete"
        );

        Ok(candidates)
    }

    /// Record the user's verdict and drop the transaction from `cached`
    pub fn review_transaction(
        &self,
        transaction_id: i64,
        is_legitimate: bool,
        feedback: Option<&str>,
        cached: &mut Vec<AnomalyCandidate>,
    ) -> Result<()> {
        self.store
            .review_transaction(transaction_id, is_legitimate, feedback)?;
        cached.retain(|c| c.transaction.id != transaction_id);

        info!(transaction_id, is_legitimate, "Transaction reviewed");
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{AnomalyReason, Transaction};
    use crate::stats::TransactionStatistics;
    use crate::test_utils::{grocery_history, tx};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store with switchable failures
    #[derive(Default)]
    struct MemoryStore {
        transactions: Mutex<Vec<Transaction>>,
        persisted: Mutex<HashMap<i64, (String, AnomalyData)>>,
        fail_fetch: bool,
        fail_persist: bool,
    }

    impl MemoryStore {
        fn with(transactions: Vec<Transaction>) -> Self {
            Self {
                transactions: Mutex::new(transactions),
                ..Default::default()
            }
        }
    }

    impl TransactionStore for MemoryStore {
        fn fetch_by_user_since(&self, user_id: i64, since: NaiveDate) -> Result<Vec<Transaction>> {
            if self.fail_fetch {
                return Err(Error::InvalidData("store offline".into()));
            }
            let mut txs: Vec<_> = self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == user_id && t.date >= since)
                .cloned()
                .collect();
            txs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            Ok(txs)
        }

        fn persist_anomaly(&self, id: i64, explanation: &str, data: &AnomalyData) -> Result<()> {
            if self.fail_persist {
                return Err(Error::InvalidData("disk full".into()));
            }
            self.persisted
                .lock()
                .unwrap()
                .insert(id, (explanation.to_string(), data.clone()));
            Ok(())
        }

        fn review_transaction(&self, id: i64, is_legitimate: bool, feedback: Option<&str>) -> Result<()> {
            let mut txs = self.transactions.lock().unwrap();
            let tx = txs
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
            tx.is_reviewed = true;
            tx.is_legitimate = Some(is_legitimate);
            tx.review_feedback = feedback.map(str::to_string);
            Ok(())
        }

        fn list_anomalies(&self, user_id: i64) -> Result<Vec<Transaction>> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == user_id && t.is_anomaly && !t.is_reviewed)
                .cloned()
                .collect())
        }
    }

    struct FailingStatistics;

    impl StatisticsCalculator for FailingStatistics {
        fn calculate(&self, _: &[Transaction]) -> Result<TransactionStatistics> {
            Err(Error::InvalidData("statistics unavailable".into()))
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn history_with_spike() -> Vec<Transaction> {
        let mut txs = grocery_history(90);
        let mut spike = tx(1000, "2024-06-30", 389.99, Some("Groceries"));
        spike.merchant_name = Some("Whole Foods".to_string());
        txs.push(spike);
        txs
    }

    fn detector<'a>(store: &'a MemoryStore, ai: Option<AIClient>) -> AnomalyDetector<'a> {
        AnomalyDetector::with_defaults(store, ai, &DetectionConfig::default())
    }

    #[tokio::test]
    async fn test_flags_large_grocery_purchase() {
        let store = MemoryStore::with(history_with_spike());
        let mock = MockBackend::with_response("Far above your usual grocery spend.");
        let detector = detector(&store, Some(mock.into()));

        let candidates = detector.detect_anomalies_as_of(1, 90, as_of()).await;

        assert_eq!(candidates.len(), 1);
        let top = &candidates[0];
        assert_eq!(top.transaction.id, 1000);
        assert!(top.has_reason(AnomalyReason::Amount));
        assert!(top.has_reason(AnomalyReason::CategoryAmount));
        assert!(top.score > 1.0);
        assert!(top.transaction.is_anomaly);
        assert_eq!(top.explanation(), "Far above your usual grocery spend.");

        let persisted = store.persisted.lock().unwrap();
        let (explanation, data) = &persisted[&1000];
        assert_eq!(explanation, "Far above your usual grocery spend.");
        assert_eq!(data.reasons, top.reasons);
        assert_eq!(data.score, top.score);
    }

    #[tokio::test]
    async fn test_first_jewelry_purchase_is_new_category() {
        let mut txs = grocery_history(30);
        txs.push(tx(500, "2024-06-30", 75.0, Some("Jewelry")));
        let store = MemoryStore::with(txs);
        let detector = detector(&store, None);

        let candidates = detector.detect_anomalies_as_of(1, 90, as_of()).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].reasons, vec![AnomalyReason::NewCategory]);
        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(
            candidates[0].explanation(),
            "You rarely spend in the Jewelry category."
        );
    }

    #[tokio::test]
    async fn test_empty_window_skips_statistics() {
        let store = MemoryStore::default();
        let detector = AnomalyDetector::new(
            &store,
            Box::new(FailingStatistics),
            Box::new(ZScoreScorer::default()),
            Box::new(AiExplainer::fallback_only()),
        );

        let result = detector.try_detect_anomalies_as_of(1, 90, as_of()).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_failure_yields_empty() {
        let store = MemoryStore::with(history_with_spike());
        let detector = AnomalyDetector::new(
            &store,
            Box::new(FailingStatistics),
            Box::new(ZScoreScorer::default()),
            Box::new(AiExplainer::fallback_only()),
        );

        assert!(detector.try_detect_anomalies_as_of(1, 90, as_of()).await.is_err());
        assert!(detector.detect_anomalies_as_of(1, 90, as_of()).await.is_empty());
        assert!(store.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty() {
        let store = MemoryStore {
            fail_fetch: true,
            ..MemoryStore::with(history_with_spike())
        };
        let detector = detector(&store, None);

        assert!(detector.try_detect_anomalies_as_of(1, 90, as_of()).await.is_err());
        assert!(detector.detect_anomalies_as_of(1, 90, as_of()).await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_explanation() {
        let store = MemoryStore {
            fail_persist: true,
            ..MemoryStore::with(history_with_spike())
        };
        let detector = detector(&store, Some(MockBackend::failing().into()));

        let candidates = detector.detect_anomalies_as_of(1, 90, as_of()).await;

        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].explanation().is_empty());
        assert!(candidates[0].transaction.anomaly_data.is_some());
    }

    #[tokio::test]
    async fn test_reviewed_transaction_not_flagged() {
        let mut txs = history_with_spike();
        let mut big = tx(2000, "2024-06-28", 10_000.0, Some("Groceries"));
        big.is_reviewed = true;
        big.is_legitimate = Some(true);
        txs.push(big);
        let store = MemoryStore::with(txs);
        let detector = detector(&store, None);

        let candidates = detector.detect_anomalies_as_of(1, 90, as_of()).await;
        assert!(candidates.iter().all(|c| c.transaction.id != 2000));
        assert!(!store.persisted.lock().unwrap().contains_key(&2000));
    }

    #[tokio::test]
    async fn test_window_excludes_future_and_old_transactions() {
        let mut txs = grocery_history(30);
        txs.push(tx(3000, "2024-07-15", 5000.0, Some("Groceries")));
        txs.push(tx(3001, "2023-01-01", 5000.0, Some("Groceries")));
        let store = MemoryStore::with(txs);
        let detector = detector(&store, None);

        let candidates = detector.detect_anomalies_as_of(1, 90, as_of()).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_negative_lookback_is_rejected() {
        let store = MemoryStore::with(history_with_spike());
        let detector = detector(&store, None);

        let result = detector.try_detect_anomalies_as_of(1, -1, as_of()).await;
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_review_removes_from_cache() {
        let store = MemoryStore::with(history_with_spike());
        let detector = detector(&store, None);
        let mut cached = detector.detect_anomalies_as_of(1, 90, as_of()).await;
        assert_eq!(cached.len(), 1);

        detector
            .review_transaction(1000, true, Some("Party supplies"), &mut cached)
            .unwrap();

        assert!(cached.is_empty());
        let txs = store.transactions.lock().unwrap();
        let reviewed = txs.iter().find(|t| t.id == 1000).unwrap();
        assert!(reviewed.is_reviewed);
        assert_eq!(reviewed.is_legitimate, Some(true));
    }

    #[tokio::test]
    async fn test_review_unknown_transaction() {
        let store = MemoryStore::with(history_with_spike());
        let detector = detector(&store, None);
        let mut cached = detector.detect_anomalies_as_of(1, 90, as_of()).await;

        let result = detector.review_transaction(9999, false, None, &mut cached);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_after_review_does_not_reflag() {
        let store = MemoryStore::with(history_with_spike());
        let detector = detector(&store, None);
        let mut cached = detector.detect_anomalies_as_of(1, 90, as_of()).await;
        detector
            .review_transaction(1000, false, None, &mut cached)
            .unwrap();

        let rerun = detector.detect_anomalies_as_of(1, 90, as_of()).await;
        assert!(rerun.iter().all(|c| c.transaction.id != 1000));
    }
}
