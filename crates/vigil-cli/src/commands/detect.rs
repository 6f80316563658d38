//! Detection command implementations

use anyhow::{Context, Result};
use vigil_core::ai::{AIBackend, AIClient};
use vigil_core::config::DetectionConfig;
use vigil_core::db::Database;
use vigil_core::detect::AnomalyDetector;
use vigil_core::explain::format_amount;
use vigil_core::models::{AnomalyCandidate, Transaction};
use vigil_core::store::TransactionStore;

use super::{find_user, truncate};

/// Run anomaly detection for a user and print the flagged transactions
pub async fn cmd_detect(
    db: &Database,
    user: &str,
    days: Option<i64>,
    ai: Option<AIClient>,
    config: &DetectionConfig,
) -> Result<Vec<AnomalyCandidate>> {
    let user = find_user(db, user)?;
    let days = days.unwrap_or(config.lookback_days);

    println!("🔍 Scanning the last {} days for {}...", days, user.name);

    // Only a responding backend is handed to the detector
    let ai = match ai {
        Some(client) if client.health_check().await => {
            println!(
                "   🤖 Explanations: {} ({} at {})",
                client.kind(),
                client.model(),
                client.host()
            );
            Some(client)
        }
        Some(client) => {
            println!(
                "   ⚠️  {} backend at {} is not responding; using built-in explanations",
                client.kind(),
                client.host()
            );
            None
        }
        None => {
            println!("   💡 Tip: Set OLLAMA_HOST (or AI_BACKEND) for AI-written explanations");
            None
        }
    };

    let detector = AnomalyDetector::with_defaults(db, ai, config);
    let candidates = detector
        .try_detect_anomalies(user.id, days)
        .await
        .context("Anomaly detection failed")?;

    println!();
    if candidates.is_empty() {
        println!("✅ Nothing unusual found.");
        return Ok(candidates);
    }

    println!("⚠️  {} unusual transaction(s)", candidates.len());
    println!();
    for candidate in &candidates {
        print_candidate(candidate);
    }
    println!("Review with: vigil review <id> --legitimate | --suspicious");

    Ok(candidates)
}

/// List flagged transactions that have not been reviewed
pub fn cmd_anomalies(db: &Database, user: &str) -> Result<Vec<Transaction>> {
    let user = find_user(db, user)?;
    let anomalies = db.list_anomalies(user.id)?;

    if anomalies.is_empty() {
        println!("No anomalies awaiting review for {}.", user.name);
        return Ok(anomalies);
    }

    println!(
        "{:<6} {:<10} {:>12}  {:<24} {:>6}  REASONS",
        "ID", "DATE", "AMOUNT", "MERCHANT", "SCORE"
    );
    println!("{}", "-".repeat(90));

    for tx in &anomalies {
        let (score, reasons) = match &tx.anomaly_data {
            Some(data) => (
                format!("{:.2}", data.score),
                data.reasons
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            None => ("-".to_string(), String::new()),
        };
        println!(
            "{:<6} {:<10} {:>12}  {:<24} {:>6}  {}",
            tx.id,
            tx.date,
            format_amount(tx.amount),
            truncate(tx.display_name(), 24),
            score,
            reasons
        );
        if let Some(explanation) = &tx.anomaly_explanation {
            println!("       {}", explanation);
        }
    }

    Ok(anomalies)
}

fn print_candidate(candidate: &AnomalyCandidate) {
    let tx = &candidate.transaction;
    println!(
        "   #{:<6} {}  {:>12}  {}  [{}]",
        tx.id,
        tx.date,
        format_amount(tx.amount),
        truncate(tx.display_name(), 32),
        tx.category_label()
    );
    println!(
        "           score {:.2} ({})",
        candidate.score,
        candidate.reasons_joined()
    );
    println!("           {}", candidate.explanation());
    println!();
}
