//! CLI command tests

use std::io::Write;
use std::path::PathBuf;

use outlay_core::db::Database;
use outlay_core::test_utils::{
    base_date, debit_credit_csv, monthly_charges, monthly_spending_ledger, signed_amount_csv,
};
use outlay_core::SessionId;
use tempfile::TempDir;

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Write a statement into a temp dir, returning the dir guard and file path
fn write_statement(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statement.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

fn netflix_statement() -> String {
    let mut ledger = monthly_charges("Netflix", -15.0, base_date(), 4);
    ledger.extend(monthly_spending_ledger(&[100.0, 120.0, 90.0, 110.0, 500.0]));
    signed_amount_csv(&ledger)
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is a long description", 10), "this is...");
    assert_eq!(truncate("₹₹₹₹₹₹₹₹₹₹₹₹", 5), "₹₹...");
}

#[test]
fn test_open_db_unencrypted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outlay.db");

    let db = commands::open_db(&path, true).unwrap();
    assert!(path.exists());
    assert!(!db.is_encrypted());
    assert!(db.list_sessions().unwrap().is_empty());
}

#[test]
fn test_parse_session() {
    assert_eq!(
        commands::parse_session("  abc ").unwrap(),
        SessionId::from("abc")
    );
    assert!(commands::parse_session("   ").is_err());
}

// ========== Analyze / Preview Tests ==========

#[test]
fn test_cmd_analyze() {
    let (_dir, path) = write_statement(&netflix_statement());
    assert!(commands::cmd_analyze(&path, false).is_ok());
    assert!(commands::cmd_analyze(&path, true).is_ok());
}

#[test]
fn test_cmd_analyze_bad_statement() {
    let (_dir, path) = write_statement("When,What,How much\nyesterday,Coffee,3\n");
    let err = commands::cmd_analyze(&path, false).unwrap_err();
    assert!(format!("{:#}", err).contains("No date column"));
}

#[test]
fn test_cmd_analyze_missing_file() {
    let result = commands::cmd_analyze(&PathBuf::from("/nonexistent/statement.csv"), false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_preview() {
    let ledger = monthly_charges("Gym", -30.0, base_date(), 3);
    let (_dir, path) = write_statement(&debit_credit_csv(&ledger));
    assert!(commands::cmd_preview(&path, 2).is_ok());
}

#[test]
fn test_cmd_preview_unmappable() {
    // Preview still succeeds when no schema can be inferred
    let (_dir, path) = write_statement("a,b,c\n1,2,3\n");
    assert!(commands::cmd_preview(&path, 5).is_ok());
}

// ========== Import Tests ==========

#[test]
fn test_cmd_import() {
    let db = setup_test_db();
    let (_dir, path) = write_statement(&netflix_statement());

    let session = commands::cmd_import(&db, &path).unwrap();

    let ledger = db.load_ledger(&session).unwrap().unwrap();
    assert_eq!(ledger.len(), 9);
    assert!(ledger.iter().any(|tx| tx.description == "Netflix"));
}

#[test]
fn test_cmd_import_failure_leaves_no_session() {
    let db = setup_test_db();
    let (_dir, path) = write_statement("Date,Description,Amount\nsoon,A,1\n");

    assert!(commands::cmd_import(&db, &path).is_err());
    assert!(db.list_sessions().unwrap().is_empty());
}

// ========== Session Detector Tests ==========

#[test]
fn test_cmd_subscriptions_persists_result() {
    let db = setup_test_db();
    let (_dir, path) = write_statement(&netflix_statement());
    let session = commands::cmd_import(&db, &path).unwrap();

    commands::cmd_subscriptions(&db, session.as_str(), true).unwrap();

    let stored = db.load_subscriptions(&session).unwrap().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].description, "Netflix");
}

#[test]
fn test_cmd_overspending() {
    let db = setup_test_db();
    let (_dir, path) = write_statement(&netflix_statement());
    let session = commands::cmd_import(&db, &path).unwrap();

    assert!(commands::cmd_overspending(&db, session.as_str(), false).is_ok());
    assert!(commands::cmd_overspending(&db, session.as_str(), true).is_ok());
}

#[test]
fn test_detectors_unknown_session() {
    let db = setup_test_db();
    assert!(commands::cmd_subscriptions(&db, "missing", false).is_err());
    assert!(commands::cmd_overspending(&db, "missing", false).is_err());
}

// ========== Sessions Tests ==========

#[test]
fn test_cmd_sessions_list_and_delete() {
    let db = setup_test_db();
    assert!(commands::cmd_sessions_list(&db).is_ok());

    let (_dir, path) = write_statement(&netflix_statement());
    let session = commands::cmd_import(&db, &path).unwrap();
    assert!(commands::cmd_sessions_list(&db).is_ok());

    commands::cmd_sessions_delete(&db, session.as_str()).unwrap();
    assert!(db.list_sessions().unwrap().is_empty());

    // Deleting again reports the missing session
    assert!(commands::cmd_sessions_delete(&db, session.as_str()).is_err());
}

#[test]
fn test_cmd_sessions_purge() {
    let db = setup_test_db();
    let (_dir, path) = write_statement(&netflix_statement());
    commands::cmd_import(&db, &path).unwrap();

    assert_eq!(commands::cmd_sessions_purge(&db, 60).unwrap(), 0);
    assert!(commands::cmd_sessions_purge(&db, -5).is_err());
    assert!(commands::cmd_sessions_purge(&db, i64::MAX).is_err());
    assert_eq!(db.list_sessions().unwrap().len(), 1);
}
