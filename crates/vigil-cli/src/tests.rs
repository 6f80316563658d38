//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use chrono::{Duration, Local};
use clap::Parser;
use vigil_core::config::DetectionConfig;
use vigil_core::db::Database;
use vigil_core::models::AnomalyReason;
use vigil_core::MockBackend;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.upsert_user("alice").unwrap();
    db
}

/// Sixty days of ordinary groceries ending yesterday, plus one large purchase today
fn write_history_csv() -> tempfile::NamedTempFile {
    let today = Local::now().date_naive();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Date,Description,Amount,Category,Merchant").unwrap();
    for i in 1..=60i64 {
        let amount = 50.0 + ((i * 37) % 51) as f64;
        writeln!(
            file,
            "{},WHOLEFDS MKT #{},{:.2},Groceries,Whole Foods",
            today - Duration::days(i),
            i,
            amount
        )
        .unwrap();
    }
    writeln!(file, "{},WHOLEFDS MKT #999,389.99,Groceries,Whole Foods", today).unwrap();
    file.flush().unwrap();
    file
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer merchant name", 10), "a longe...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}

#[test]
fn test_open_db_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.db");

    let db = commands::open_db(&path, true).unwrap();
    db.upsert_user("alice").unwrap();

    let reopened = commands::open_db(&path, true).unwrap();
    assert_eq!(reopened.list_users().unwrap().len(), 1);
}

#[test]
fn test_find_user_unknown() {
    let db = setup_test_db();
    let err = commands::find_user(&db, "mallory").unwrap_err();
    assert!(err.to_string().contains("vigil users add mallory"));
}

// ========== Users Command Tests ==========

#[test]
fn test_cmd_users_add_and_list() {
    let db = Database::in_memory().unwrap();
    commands::cmd_users_add(&db, "bob").unwrap();
    commands::cmd_users_add(&db, "bob").unwrap();

    assert_eq!(db.list_users().unwrap().len(), 1);
    assert!(commands::cmd_users_list(&db).is_ok());
}

#[test]
fn test_cmd_users_add_blank_name() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_users_add(&db, "  ").is_err());
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import() {
    let db = setup_test_db();
    let csv = write_history_csv();

    let summary = commands::cmd_import(&db, "alice", csv.path(), false).unwrap();
    assert_eq!(summary.imported, 61);
    assert_eq!(summary.duplicates, 0);

    let again = commands::cmd_import(&db, "alice", csv.path(), false).unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates, 61);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let result = commands::cmd_import(
        &db,
        "alice",
        std::path::Path::new("/nonexistent/file.csv"),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_import_unknown_user() {
    let db = setup_test_db();
    let csv = write_history_csv();
    assert!(commands::cmd_import(&db, "nobody", csv.path(), false).is_err());
}

// ========== Detect / Review Command Tests ==========

#[tokio::test]
async fn test_cmd_detect_flags_and_persists() {
    let db = setup_test_db();
    let csv = write_history_csv();
    commands::cmd_import(&db, "alice", csv.path(), false).unwrap();

    let mock = MockBackend::with_response("Much bigger than your usual grocery trip.");
    let candidates = commands::cmd_detect(
        &db,
        "alice",
        Some(90),
        Some(mock.into()),
        &DetectionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].transaction.amount, 389.99);
    assert!(candidates[0].has_reason(AnomalyReason::Amount));

    let pending = commands::cmd_anomalies(&db, "alice").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].anomaly_explanation.as_deref(),
        Some("Much bigger than your usual grocery trip.")
    );
}

#[tokio::test]
async fn test_cmd_detect_without_backend_uses_fallback() {
    let db = setup_test_db();
    let csv = write_history_csv();
    commands::cmd_import(&db, "alice", csv.path(), false).unwrap();

    let candidates = commands::cmd_detect(&db, "alice", None, None, &DetectionConfig::default())
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert!(!candidates[0].explanation().is_empty());
}

#[tokio::test]
async fn test_cmd_detect_skips_unhealthy_backend() {
    let db = setup_test_db();
    let csv = write_history_csv();
    commands::cmd_import(&db, "alice", csv.path(), false).unwrap();

    let mut mock = MockBackend::with_response("Written by the model.");
    mock.healthy = false;
    let candidates = commands::cmd_detect(
        &db,
        "alice",
        None,
        Some(mock.clone().into()),
        &DetectionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(mock.calls(), 0);
    assert!(!candidates[0].explanation().is_empty());
    assert_ne!(candidates[0].explanation(), "Written by the model.");
}

#[tokio::test]
async fn test_cmd_detect_empty_history() {
    let db = setup_test_db();
    let candidates = commands::cmd_detect(&db, "alice", None, None, &DetectionConfig::default())
        .await
        .unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_cmd_review_clears_pending() {
    let db = setup_test_db();
    let csv = write_history_csv();
    commands::cmd_import(&db, "alice", csv.path(), false).unwrap();
    let candidates = commands::cmd_detect(&db, "alice", None, None, &DetectionConfig::default())
        .await
        .unwrap();
    let id = candidates[0].transaction.id;

    commands::cmd_review(&db, id, true, Some("Catering order")).unwrap();

    assert!(commands::cmd_anomalies(&db, "alice").unwrap().is_empty());
    let tx = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(tx.is_legitimate, Some(true));
    assert_eq!(tx.review_feedback.as_deref(), Some("Catering order"));
}

#[test]
fn test_cmd_review_unknown_transaction() {
    let db = setup_test_db();
    let err = commands::cmd_review(&db, 4242, false, None).unwrap_err();
    assert!(err.to_string().contains("4242"));
}

// ========== Prompts Command Tests ==========

#[test]
fn test_cmd_prompts_show() {
    assert!(commands::cmd_prompts_show("explain_anomaly").is_ok());
    assert!(commands::cmd_prompts_show("nonexistent").is_err());
}

#[test]
fn test_cmd_prompts_list() {
    assert!(commands::cmd_prompts_list().is_ok());
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_review_requires_verdict() {
    assert!(Cli::try_parse_from(["vigil", "review", "7"]).is_err());
    assert!(
        Cli::try_parse_from(["vigil", "review", "7", "--legitimate", "--suspicious"]).is_err()
    );

    let cli = Cli::try_parse_from(["vigil", "review", "7", "--suspicious", "-f", "not me"]).unwrap();
    match cli.command {
        Commands::Review {
            id,
            legitimate,
            suspicious,
            feedback,
        } => {
            assert_eq!(id, 7);
            assert!(!legitimate);
            assert!(suspicious);
            assert_eq!(feedback.as_deref(), Some("not me"));
        }
        _ => panic!("expected review command"),
    }
}

#[test]
fn test_global_flags() {
    let cli = Cli::try_parse_from([
        "vigil",
        "detect",
        "--user",
        "alice",
        "--days",
        "30",
        "--db",
        "other.db",
        "--no-encrypt",
    ])
    .unwrap();

    assert!(cli.no_encrypt);
    assert_eq!(cli.db, std::path::PathBuf::from("other.db"));
    match cli.command {
        Commands::Detect { user, days } => {
            assert_eq!(user, "alice");
            assert_eq!(days, Some(30));
        }
        _ => panic!("expected detect command"),
    }
}
