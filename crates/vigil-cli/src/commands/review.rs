//! Review command implementation

use anyhow::{Context, Result};
use vigil_core::db::Database;
use vigil_core::explain::format_amount;
use vigil_core::store::TransactionStore;

pub fn cmd_review(
    db: &Database,
    id: i64,
    is_legitimate: bool,
    feedback: Option<&str>,
) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .with_context(|| format!("Transaction {} not found", id))?;

    db.review_transaction(id, is_legitimate, feedback)
        .with_context(|| format!("Failed to review transaction {}", id))?;

    let verdict = if is_legitimate {
        "legitimate"
    } else {
        "suspicious"
    };
    println!(
        "✅ Marked #{} ({} {} on {}) as {}",
        tx.id,
        tx.display_name(),
        format_amount(tx.amount),
        tx.date,
        verdict
    );
    if !tx.is_anomaly {
        println!("   Note: this transaction was not flagged as an anomaly");
    }

    Ok(())
}
