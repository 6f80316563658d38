//! Descriptive statistics over a transaction window
//!
//! Computes the baseline the scorer compares each transaction against:
//! - Global amount statistics (mean, sample standard deviation, min, max)
//! - Per-category counts, share of the window and amount statistics
//! - Daily frequency over days with activity
//! - Day-of-week histogram (Sunday = 0)

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::models::Transaction;

/// Amount statistics for a set of transactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmountStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (N - 1); 0 when count <= 1
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl AmountStats {
    /// Compute statistics over a list of amounts
    pub fn from_amounts(amounts: &[f64]) -> Self {
        if amounts.is_empty() {
            return Self::default();
        }

        let count = amounts.len();
        let mean = mean(amounts);
        let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
        let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            count,
            mean,
            std_dev: sample_std_dev(amounts, mean),
            min,
            max,
        }
    }

    /// Standard deviation to divide by when computing a z-score
    ///
    /// Zero variance falls back to 1 so the z-score degrades to a plain deviation.
    pub fn z_divisor(&self) -> f64 {
        if self.std_dev > 0.0 {
            self.std_dev
        } else {
            1.0
        }
    }

    /// z-score of an amount against these statistics
    pub fn z_score(&self, amount: f64) -> f64 {
        (amount - self.mean) / self.z_divisor()
    }
}

/// Statistics for a single category label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub count: usize,
    /// Share of the window's transactions, 0-100
    pub percentage: f64,
    pub amount: AmountStats,
}

/// How many transactions happen per active day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyStats {
    /// Transactions divided by days that had at least one transaction
    pub mean_per_day: f64,
    /// Sample standard deviation of per-day counts across active days
    pub std_dev: f64,
    pub max_per_day: usize,
    pub active_days: usize,
}

/// Statistics over one detection window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStatistics {
    pub transaction_count: usize,
    pub amount: AmountStats,
    pub categories: HashMap<String, CategoryStats>,
    pub frequency: FrequencyStats,
    /// Transactions per weekday, Sunday-indexed
    pub day_of_week: [usize; 7],
}

impl TransactionStatistics {
    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }

    pub fn category(&self, label: &str) -> Option<&CategoryStats> {
        self.categories.get(label)
    }
}

/// Computes window statistics for the scorer
pub trait StatisticsCalculator: Send + Sync {
    fn calculate(&self, transactions: &[Transaction]) -> Result<TransactionStatistics>;
}

/// Default calculator: plain descriptive statistics over the whole window
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowStatistics;

impl StatisticsCalculator for WindowStatistics {
    fn calculate(&self, transactions: &[Transaction]) -> Result<TransactionStatistics> {
        Ok(compute_statistics(transactions))
    }
}

/// Compute statistics over a window of transactions
pub fn compute_statistics(transactions: &[Transaction]) -> TransactionStatistics {
    if transactions.is_empty() {
        return TransactionStatistics::default();
    }

    let total = transactions.len();
    let amounts: Vec<f64> = transactions.iter().map(|tx| tx.amount).collect();

    let mut by_category: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut day_of_week = [0usize; 7];

    for tx in transactions {
        by_category
            .entry(tx.category_label())
            .or_default()
            .push(tx.amount);
        *by_day.entry(tx.date).or_default() += 1;
        day_of_week[tx.date.weekday().num_days_from_sunday() as usize] += 1;
    }

    let categories = by_category
        .into_iter()
        .map(|(label, amounts)| {
            let stats = CategoryStats {
                count: amounts.len(),
                percentage: amounts.len() as f64 / total as f64 * 100.0,
                amount: AmountStats::from_amounts(&amounts),
            };
            (label.to_string(), stats)
        })
        .collect();

    TransactionStatistics {
        transaction_count: total,
        amount: AmountStats::from_amounts(&amounts),
        categories,
        frequency: frequency_stats(&by_day, total),
        day_of_week,
    }
}

fn frequency_stats(by_day: &BTreeMap<NaiveDate, usize>, total: usize) -> FrequencyStats {
    let active_days = by_day.len();
    if active_days == 0 {
        return FrequencyStats::default();
    }

    let counts: Vec<f64> = by_day.values().map(|&c| c as f64).collect();
    let mean_per_day = total as f64 / active_days as f64;

    FrequencyStats {
        mean_per_day,
        std_dev: sample_std_dev(&counts, mean_per_day),
        max_per_day: by_day.values().copied().max().unwrap_or(0),
        active_days,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 for fewer than two values
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tx;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_window_is_zeroed() {
        let stats = compute_statistics(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats.amount, AmountStats::default());
        assert!(stats.categories.is_empty());
        assert_eq!(stats.frequency, FrequencyStats::default());
        assert_eq!(stats.day_of_week, [0; 7]);
    }

    #[test]
    fn test_sample_std_dev() {
        // Sample (N-1) std dev of 2,4,4,4,5,5,7,9 is ~2.138
        let amounts = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = AmountStats::from_amounts(&amounts);
        assert!(approx(stats.mean, 5.0));
        assert!((stats.std_dev - 2.138_089_935).abs() < 1e-6);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_single_value_has_zero_std_dev() {
        let stats = AmountStats::from_amounts(&[42.0]);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.z_divisor(), 1.0);
        assert!(approx(stats.z_score(45.0), 3.0));
    }

    #[test]
    fn test_small_categories_never_nan() {
        let txs = vec![
            tx(1, "2024-03-01", 50.0, Some("Groceries")),
            tx(2, "2024-03-02", 70.0, Some("Groceries")),
            tx(3, "2024-03-03", 900.0, Some("Travel")),
        ];
        let stats = compute_statistics(&txs);

        let travel = stats.category("Travel").unwrap();
        assert_eq!(travel.count, 1);
        assert_eq!(travel.amount.std_dev, 0.0);
        assert!(!travel.amount.std_dev.is_nan());

        let groceries = stats.category("Groceries").unwrap();
        assert!(groceries.amount.std_dev > 0.0);
    }

    #[test]
    fn test_category_percentages() {
        let txs = vec![
            tx(1, "2024-03-01", 10.0, Some("Dining")),
            tx(2, "2024-03-01", 10.0, Some("Dining")),
            tx(3, "2024-03-02", 10.0, Some("Dining")),
            tx(4, "2024-03-03", 10.0, None),
        ];
        let stats = compute_statistics(&txs);

        assert!(approx(stats.category("Dining").unwrap().percentage, 75.0));
        assert!(approx(
            stats.category(crate::models::UNCATEGORIZED).unwrap().percentage,
            25.0
        ));
    }

    #[test]
    fn test_frequency_uses_active_days() {
        // 4 transactions on 2 distinct days inside a much longer window
        let txs = vec![
            tx(1, "2024-03-01", 10.0, None),
            tx(2, "2024-03-01", 10.0, None),
            tx(3, "2024-03-01", 10.0, None),
            tx(4, "2024-03-20", 10.0, None),
        ];
        let stats = compute_statistics(&txs);

        assert_eq!(stats.frequency.active_days, 2);
        assert!(approx(stats.frequency.mean_per_day, 2.0));
        assert_eq!(stats.frequency.max_per_day, 3);
        // counts [3, 1] -> sample std dev sqrt(2)
        assert!(approx(stats.frequency.std_dev, 2f64.sqrt()));
    }

    #[test]
    fn test_day_of_week_is_sunday_indexed() {
        // 2024-03-03 was a Sunday, 2024-03-09 a Saturday
        let txs = vec![
            tx(1, "2024-03-03", 10.0, None),
            tx(2, "2024-03-09", 10.0, None),
            tx(3, "2024-03-10", 10.0, None),
        ];
        let stats = compute_statistics(&txs);
        assert_eq!(stats.day_of_week, [2, 0, 0, 0, 0, 0, 1]);
    }
}
