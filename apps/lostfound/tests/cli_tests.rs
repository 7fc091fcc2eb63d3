//! Integration tests for Lost & Found CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, TimeZone, Utc};
use lostfound::cli::{
    cmd_init, cmd_match, cmd_search, cmd_seed, cmd_stats, open_catalog, seed::SAMPLE_USERNAME,
};
use lostfound::notifier::{LogNotifier, Notifier};
use lostfound_core::{ItemStatus, ItemType, SearchQuery};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().unwrap()
}

/// An initialised and seeded database.
fn seeded_db(dir: &TempDir, backend: &str) -> PathBuf {
    let db_path = dir.path().join(format!("seeded.{}", backend));
    cmd_init(&db_path, backend, false).unwrap();
    cmd_seed(&db_path, backend, now()).unwrap();
    db_path
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_file_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    let result = cmd_init(&db_path, "file", false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_creates_redb_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.redb");

    let result = cmd_init(&db_path, "redb", false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    // First init
    cmd_init(&db_path, "file", false).unwrap();

    // Second init should fail
    let result = cmd_init(&db_path, "file", false);
    assert!(result.is_err());
}

#[test]
fn test_init_with_force_resets_database() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    cmd_init(&db_path, "file", true).unwrap();

    let catalog = open_catalog(&db_path, "file").unwrap();
    assert!(catalog.items().unwrap().is_empty());
    assert!(catalog.users().unwrap().is_empty());
}

#[test]
fn test_init_rejects_unknown_backend() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.db");

    let result = cmd_init(&db_path, "sqlite", false);
    assert!(result.is_err());
    assert!(!db_path.exists());
}

#[test]
fn test_commands_require_initialised_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("missing.db");

    assert!(open_catalog(&db_path, "file").is_err());
    assert!(cmd_stats(&db_path, "file", false, now()).is_err());
}

// =============================================================================
// SEED COMMAND TESTS
// =============================================================================

#[test]
fn test_seed_loads_approved_sample_items() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let catalog = open_catalog(&db_path, "file").unwrap();
    let user = catalog.user_by_name(SAMPLE_USERNAME).unwrap().unwrap();
    let items = catalog.items().unwrap();
    assert_eq!(items.len(), 8);
    assert!(items.iter().all(|i| i.owner == user.id));
    assert!(items.iter().all(|i| i.status == ItemStatus::Approved));
}

#[test]
fn test_seed_is_idempotent_on_redb() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "redb");

    let report = cmd_seed(&db_path, "redb", now()).unwrap();
    assert!(!report.user_created);
    assert_eq!(report.items_created, 0);
    assert_eq!(report.items_skipped, 8);

    let catalog = open_catalog(&db_path, "redb").unwrap();
    assert_eq!(catalog.items().unwrap().len(), 8);
}

// =============================================================================
// MATCH COMMAND TESTS
// =============================================================================

#[test]
fn test_match_is_stable_across_runs() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let first = cmd_match(&db_path, "file", None, now()).unwrap();
    // 3 lost x 5 found sample items
    assert!(first.pairs_examined <= 15);
    assert!(first.delivered.is_none());

    let second = cmd_match(&db_path, "file", None, now()).unwrap();
    assert_eq!(second.matches_created, 0);
    assert_eq!(
        second.pairs_examined,
        first.pairs_examined - first.matches_created
    );
}

#[test]
fn test_match_with_notifications_sends_reminders() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    // Four days later every unclaimed sample item is due a reminder.
    let later = now() + chrono::Duration::days(4);
    let notifier = LogNotifier;
    let target: (&dyn Notifier, &str) = (&notifier, "http://lost.test");
    let summary = cmd_match(&db_path, "file", Some(target), later).unwrap();

    let delivered = summary.delivered.unwrap();
    assert_eq!(delivered.reminders, 8);
    assert_eq!(delivered.failed, 0);
}

// =============================================================================
// STATS COMMAND TESTS
// =============================================================================

#[test]
fn test_stats_text_output() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let output = cmd_stats(&db_path, "file", false, now()).unwrap();
    assert!(output.contains("Total items:     8"));
    assert!(output.contains("  lost:          3"));
    assert!(output.contains("  found:         5"));
    assert!(output.contains("Return rate:     0.0%"));
}

#[test]
fn test_stats_json_output() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let output = cmd_stats(&db_path, "file", true, now()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["total_items"], 8);
    assert_eq!(value["total_found"], 5);
}

// =============================================================================
// SEARCH COMMAND TESTS
// =============================================================================

#[test]
fn test_search_strict_hit() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let output = cmd_search(&db_path, "file", &SearchQuery::text("wallet"), None).unwrap();
    assert!(output.contains("Black Wallet"));
    assert!(!output.contains("No exact results"));
}

#[test]
fn test_search_relaxes_when_nothing_matches() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let query = SearchQuery {
        item_type: Some(ItemType::Lost),
        ..SearchQuery::text("zzzz qqqq")
    };
    let output = cmd_search(&db_path, "file", &query, None).unwrap();
    assert!(output.contains("No exact results"));
    assert!(output.contains("[Lost]"));
}

#[test]
fn test_search_out_of_range_page_shows_last_page() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp, "file");

    let output = cmd_search(&db_path, "file", &SearchQuery::default(), Some("99")).unwrap();
    assert!(output.contains("8 results (page 1 of 1"));
}
