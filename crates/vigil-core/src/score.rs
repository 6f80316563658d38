//! Rule-based anomaly scoring
//!
//! Each unreviewed transaction is checked against the window statistics:
//! 1. Global amount z-score
//! 2. Category-relative amount z-score and category rarity (category has history)
//! 3. Novel category (category has no history)
//!
//! A category has history when at least one other transaction in the window
//! shares its label. Since statistics cover the same window being scored, a
//! category whose only occurrence is the scored transaction counts as novel.

use tracing::debug;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::models::{AnomalyCandidate, AnomalyReason, Transaction};
use crate::stats::TransactionStatistics;

/// Minimum score that qualifies a transaction on its own
const QUALIFYING_SCORE: f64 = 1.0;

/// Flags and scores candidate anomalies
pub trait AnomalyScorer: Send + Sync {
    fn score(
        &self,
        transactions: &[Transaction],
        stats: &TransactionStatistics,
    ) -> Result<Vec<AnomalyCandidate>>;
}

/// z-score and category-rarity heuristics
#[derive(Debug, Clone)]
pub struct ZScoreScorer {
    config: DetectionConfig,
}

impl Default for ZScoreScorer {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl ZScoreScorer {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Score a single transaction, returning the reasons that fired and the total
    pub fn evaluate(
        &self,
        tx: &Transaction,
        stats: &TransactionStatistics,
    ) -> (Vec<AnomalyReason>, f64) {
        let mut reasons = Vec::new();
        let mut score = 0.0;

        let z = stats.amount.z_score(tx.amount);
        if z.abs() > self.config.amount_z_threshold {
            reasons.push(AnomalyReason::Amount);
            score += z.abs() / 2.0;
        }

        match stats
            .category(tx.category_label())
            .filter(|c| c.count >= 2)
        {
            Some(category) => {
                let cz = category.amount.z_score(tx.amount);
                if cz.abs() > self.config.category_z_threshold {
                    reasons.push(AnomalyReason::CategoryAmount);
                    score += cz.abs() / 2.0;
                }

                let rare = self.config.rare_category_percent;
                if category.percentage < rare {
                    reasons.push(AnomalyReason::RareCategory);
                    score += (rare - category.percentage) / rare;
                }
            }
            None => {
                reasons.push(AnomalyReason::NewCategory);
                score += self.config.new_category_weight;
            }
        }

        (reasons, score)
    }
}

impl AnomalyScorer for ZScoreScorer {
    fn score(
        &self,
        transactions: &[Transaction],
        stats: &TransactionStatistics,
    ) -> Result<Vec<AnomalyCandidate>> {
        let mut candidates = Vec::new();

        for tx in transactions.iter().filter(|tx| !tx.is_reviewed) {
            let (reasons, score) = self.evaluate(tx, stats);

            if score >= QUALIFYING_SCORE || !reasons.is_empty() {
                debug!(
                    transaction_id = tx.id,
                    score,
                    reasons = ?reasons,
                    "Candidate anomaly"
                );
                candidates.push(AnomalyCandidate {
                    transaction: tx.clone(),
                    reasons,
                    score,
                });
            }
        }

        // sort_by is stable: equal scores keep input order
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::compute_statistics;
    use crate::test_utils::{grocery_history, tx};

    fn score(txs: &[Transaction]) -> Vec<AnomalyCandidate> {
        let stats = compute_statistics(txs);
        ZScoreScorer::default().score(txs, &stats).unwrap()
    }

    #[test]
    fn test_large_grocery_purchase_is_flagged() {
        let mut txs = grocery_history(90);
        txs.insert(0, tx(999, "2024-06-30", 389.99, Some("Groceries")));

        let candidates = score(&txs);
        let hit = candidates
            .iter()
            .find(|c| c.transaction.id == 999)
            .expect("large purchase flagged");

        assert!(
            hit.has_reason(AnomalyReason::Amount)
                || hit.has_reason(AnomalyReason::CategoryAmount)
        );
        assert!(hit.score > 1.0);
        assert_eq!(candidates[0].transaction.id, 999);
    }

    #[test]
    fn test_first_jewelry_purchase_is_new_category() {
        let mut txs = grocery_history(60);
        txs.insert(0, tx(500, "2024-06-30", 80.0, Some("Jewelry")));

        let candidates = score(&txs);
        let hit = candidates.iter().find(|c| c.transaction.id == 500).unwrap();

        assert_eq!(hit.reasons, vec![AnomalyReason::NewCategory]);
        assert!((hit.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_uncategorized_row_is_new_category() {
        let mut txs = grocery_history(60);
        txs.insert(0, tx(500, "2024-06-30", 75.0, None));

        let candidates = score(&txs);
        let hit = candidates.iter().find(|c| c.transaction.id == 500).unwrap();

        assert_eq!(hit.reasons, vec![AnomalyReason::NewCategory]);
        assert!((hit.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_uncategorized_rows_are_rare_not_new() {
        let mut txs = grocery_history(60);
        txs.insert(0, tx(500, "2024-06-30", 75.0, None));
        txs.insert(1, tx(501, "2024-06-30", 75.0, None));

        let candidates = score(&txs);
        // 2 of 62 rows, both at the bucket mean with zero spread
        let expected = (5.0 - 2.0 / 62.0 * 100.0) / 5.0;
        for id in [500, 501] {
            let hit = candidates.iter().find(|c| c.transaction.id == id).unwrap();
            assert_eq!(hit.reasons, vec![AnomalyReason::RareCategory]);
            assert!((hit.score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_repeat_first_purchase_counts_as_history() {
        let mut txs = grocery_history(60);
        txs.insert(0, tx(500, "2024-06-30", 75.0, Some("Jewelry")));
        txs.insert(1, tx(501, "2024-06-30", 75.0, Some("Jewelry")));

        let candidates = score(&txs);
        for id in [500, 501] {
            let hit = candidates.iter().find(|c| c.transaction.id == id).unwrap();
            assert!(!hit.has_reason(AnomalyReason::NewCategory));
            assert_eq!(hit.reasons, vec![AnomalyReason::RareCategory]);
            assert!(hit.score < QUALIFYING_SCORE);
        }
    }

    #[test]
    fn test_reviewed_transactions_are_skipped() {
        let mut txs = grocery_history(60);
        let mut big = tx(777, "2024-06-30", 10_000.0, Some("Groceries"));
        big.is_reviewed = true;
        big.is_legitimate = Some(true);
        txs.insert(0, big);

        let candidates = score(&txs);
        assert!(candidates.iter().all(|c| c.transaction.id != 777));
    }

    #[test]
    fn test_rare_category_alone_qualifies() {
        // 2 of 50 transactions = 4% -> rarity contribution 0.2, below 1 but still kept
        let mut txs: Vec<Transaction> = (0..48)
            .map(|i| tx(i, "2024-05-01", 50.0 + (i % 5) as f64, Some("Groceries")))
            .collect();
        txs.push(tx(100, "2024-05-02", 52.0, Some("Books")));
        txs.push(tx(101, "2024-05-03", 52.0, Some("Books")));

        let candidates = score(&txs);
        let books: Vec<_> = candidates
            .iter()
            .filter(|c| c.transaction.category.as_deref() == Some("Books"))
            .collect();

        assert_eq!(books.len(), 2);
        for c in books {
            assert_eq!(c.reasons, vec![AnomalyReason::RareCategory]);
            assert!((c.score - 0.2).abs() < 1e-9);
            assert!(c.score < QUALIFYING_SCORE);
        }
    }

    #[test]
    fn test_ordinary_transactions_not_flagged() {
        let txs = grocery_history(90);
        assert!(score(&txs).is_empty());
    }

    #[test]
    fn test_zero_std_dev_uses_unit_divisor() {
        // Flat history: both global and category std dev are 0
        let stats = compute_statistics(&[
            tx(1, "2024-05-01", 10.0, Some("Parking")),
            tx(2, "2024-05-02", 10.0, Some("Parking")),
        ]);
        let scorer = ZScoreScorer::default();
        let (reasons, score) =
            scorer.evaluate(&tx(3, "2024-05-03", 14.0, Some("Parking")), &stats);

        // |14 - 10| / 1 = 4 > 2.5 for both global and category checks
        assert_eq!(
            reasons,
            vec![AnomalyReason::Amount, AnomalyReason::CategoryAmount]
        );
        assert!((score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut txs = grocery_history(60);
        // Two novel categories with identical scores, then one large outlier
        txs.insert(0, tx(601, "2024-06-28", 75.0, Some("Hobby")));
        txs.insert(0, tx(602, "2024-06-29", 75.0, Some("Garden")));
        txs.insert(0, tx(603, "2024-06-30", 2_000.0, Some("Groceries")));

        let candidates = score(&txs);
        for pair in candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let ids: Vec<i64> = candidates.iter().map(|c| c.transaction.id).collect();
        let garden = ids.iter().position(|&id| id == 602).unwrap();
        let hobby = ids.iter().position(|&id| id == 601).unwrap();
        assert!(garden < hobby, "equal scores keep input order");
        assert_eq!(ids[0], 603);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let mut txs = grocery_history(90);
        txs.insert(0, tx(999, "2024-06-30", 389.99, Some("Groceries")));
        txs.insert(0, tx(998, "2024-06-30", 80.0, Some("Jewelry")));

        let first = score(&txs);
        let second = score(&txs);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.transaction.id, b.transaction.id);
            assert_eq!(a.reasons, b.reasons);
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let txs = grocery_history(90);
        let stats = compute_statistics(&txs);
        let config = DetectionConfig {
            amount_z_threshold: 0.1,
            category_z_threshold: 100.0,
            ..Default::default()
        };

        let candidates = ZScoreScorer::new(config).score(&txs, &stats).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|c| c.reasons == vec![AnomalyReason::Amount]));
    }
}
