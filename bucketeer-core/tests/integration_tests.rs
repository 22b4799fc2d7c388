//! Integration tests for bucketeer-core services
//!
//! These tests run the full ingest -> screen -> commit -> summarize flow
//! against real DuckDB. Only the statement files are synthetic; all store
//! operations hit an actual database in a temp directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use bucketeer_core::adapters::duckdb::DuckDbStore;
use bucketeer_core::config::Config;
use bucketeer_core::ports::Store;
use bucketeer_core::services::{FormatCatalog, IngestService};
use bucketeer_core::BucketeerContext;

const USER: &str = "test-user";

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a context over a fresh DuckDB store in the temp directory
async fn create_test_context(temp_dir: &TempDir) -> BucketeerContext {
    let db_path = temp_dir.path().join("test.duckdb");
    let store = Arc::new(DuckDbStore::new(&db_path).expect("Failed to open store"));
    store.init().await.expect("Failed to initialize schema");
    BucketeerContext::with_store(Config::default(), store)
}

/// Write a statement CSV dated in the current year (so it falls inside
/// the dedup lookback window) and return its path
fn write_statement(temp_dir: &TempDir, name: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
    let year = Utc::now().date_naive().year();
    let mut content = String::from("Date,Description,Amount\n");
    for (day, description, amount) in rows {
        content.push_str(&format!("{}-01-{},{},{}\n", year, day, description, amount));
    }
    let path = temp_dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Ingest -> screen -> commit round trips
// ============================================================================

#[tokio::test]
async fn test_first_import_screens_everything_as_new() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let path = write_statement(
        &temp_dir,
        "statement.csv",
        &[
            ("01", "Rent", "-1200.00"),
            ("02", "Paycheck", "2500.00"),
            ("02", "Paycheck", "2500.00"), // literal duplicate of the row above
        ],
    );

    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    assert!(outcome.mapping.is_some());
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.transactions.len(), 3);

    // The literal duplicate pair collapses to one key; the batch still
    // screens 3-for-3 against an empty store
    let keys: std::collections::HashSet<String> = outcome
        .transactions
        .iter()
        .map(|t| t.natural_key())
        .collect();
    assert_eq!(keys.len(), 2);

    let screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();
    assert_eq!(screened.new_count, 3);
    assert_eq!(screened.existing_count, 0);
}

#[tokio::test]
async fn test_second_import_reports_everything_as_existing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let path = write_statement(
        &temp_dir,
        "statement.csv",
        &[
            ("01", "Rent", "-1200.00"),
            ("02", "Paycheck", "2500.00"),
            ("02", "Paycheck", "2500.00"),
        ],
    );

    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();

    for candidate in screened.new_transactions {
        ctx.categorize_service
            .commit(USER, candidate, None)
            .await
            .unwrap();
    }

    // Re-upload of the same file: all rows are already stored
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();
    assert_eq!(screened.existing_count, 3);
    assert_eq!(screened.new_count, 0);
    assert!(screened.new_transactions.is_empty());
}

#[tokio::test]
async fn test_screen_against_partially_stored_batch() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    // Store exactly one known transaction
    let stored = write_statement(&temp_dir, "first.csv", &[("05", "Coffee", "-4.50")]);
    let outcome = ctx.ingest_service.process_file(&stored).unwrap();
    for candidate in outcome.transactions {
        ctx.categorize_service
            .commit(USER, candidate, None)
            .await
            .unwrap();
    }

    // Candidate batch: that same triple plus a genuinely new one
    let batch = write_statement(
        &temp_dir,
        "second.csv",
        &[("05", "Coffee", "-4.50"), ("06", "Books", "-20.00")],
    );
    let outcome = ctx.ingest_service.process_file(&batch).unwrap();
    let screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();

    assert_eq!(screened.existing_count, 1);
    assert_eq!(screened.new_count, 1);
    assert_eq!(screened.new_transactions[0].description, "Books");
}

#[tokio::test]
async fn test_interrupted_session_is_resumable() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let path = write_statement(
        &temp_dir,
        "statement.csv",
        &[
            ("01", "Rent", "-1200.00"),
            ("02", "Paycheck", "2500.00"),
            ("03", "Groceries", "-80.00"),
        ],
    );

    // First session: commit only the first transaction, then "crash"
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let mut screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();
    let first = screened.new_transactions.remove(0);
    ctx.categorize_service.commit(USER, first, None).await.unwrap();

    // Second session: re-import; the committed one surfaces as existing
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let screened = ctx
        .dedup_service
        .screen(USER, outcome.transactions)
        .await
        .unwrap();
    assert_eq!(screened.existing_count, 1);
    assert_eq!(screened.new_count, 2);
}

// ============================================================================
// Row-level partial failure
// ============================================================================

#[tokio::test]
async fn test_bad_rows_do_not_sink_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let year = Utc::now().date_naive().year();
    let mut content = String::from("Date,Description,Amount\n");
    for i in 1..=10 {
        let description = if i == 4 { "" } else { "Coffee" };
        content.push_str(&format!("{}-01-{:02},{},-4.{:02}\n", year, i, description, i));
    }
    let path = temp_dir.path().join("statement.csv");
    std::fs::write(&path, content).unwrap();

    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    assert_eq!(outcome.transactions.len(), 9);
    assert_eq!(outcome.errors.len(), 1);
    // Data row 4 is file row 5 (header offset)
    assert_eq!(outcome.errors[0].row, 5);
    assert!(outcome.errors[0].message.contains("Missing required data"));
}

// ============================================================================
// Store behavior
// ============================================================================

#[tokio::test]
async fn test_commit_twice_stores_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let path = write_statement(&temp_dir, "statement.csv", &[("05", "Coffee", "-4.50")]);
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let candidate = outcome.transactions.into_iter().next().unwrap();

    let id_a = ctx
        .categorize_service
        .commit(USER, candidate.clone(), None)
        .await
        .unwrap();
    let id_b = ctx
        .categorize_service
        .commit(USER, candidate.clone(), Some("bucket-x".to_string()))
        .await
        .unwrap();
    assert_eq!(id_a, id_b);

    let partition = ctx
        .store
        .list_partition(USER, candidate.date.year(), candidate.date.month())
        .await
        .unwrap();
    assert_eq!(partition.len(), 1);
    assert_eq!(partition[0].category_id.as_deref(), Some("bucket-x"));

    // Direct partition-path lookup resolves the same record
    let fetched = ctx
        .store
        .get_transaction(USER, candidate.date.year(), candidate.date.month(), &id_a)
        .await
        .unwrap()
        .expect("stored transaction should be addressable by its key");
    assert_eq!(fetched.description, candidate.description);
    assert!(ctx
        .store
        .get_transaction(USER, candidate.date.year(), candidate.date.month(), "missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_stored_fields_round_trip_through_duckdb() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let year = Utc::now().date_naive().year();
    let path = temp_dir.path().join("statement.csv");
    std::fs::write(
        &path,
        format!(
            "Date,Merchant,Amount,Original Statement\n\
             {}-01-05,Coffee,\"($4.50)\",SQ *COFFEE SHOP 0042\n",
            year
        ),
    )
    .unwrap();

    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let mapping = outcome.mapping.as_ref().unwrap();
    assert_eq!(
        mapping.raw_description_column.as_deref(),
        Some("Original Statement")
    );

    let candidate = outcome.transactions.into_iter().next().unwrap();
    ctx.categorize_service
        .commit(USER, candidate, None)
        .await
        .unwrap();

    let stored = ctx.store.list_partition(USER, year, 1).await.unwrap();
    let tx = &stored[0];
    assert_eq!(tx.description, "Coffee");
    assert_eq!(tx.amount, Decimal::new(-450, 2));
    assert_eq!(tx.raw_description.as_deref(), Some("SQ *COFFEE SHOP 0042"));
    // The source row survives for audit, including unmapped columns
    assert_eq!(
        tx.original_data.get("Original Statement").map(String::as_str),
        Some("SQ *COFFEE SHOP 0042")
    );
}

// ============================================================================
// Buckets and summary
// ============================================================================

#[tokio::test]
async fn test_default_buckets_and_summary_grouping() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let buckets = ctx.bucket_service.ensure_defaults(USER).await.unwrap();
    assert_eq!(buckets.len(), 3);
    let personal = buckets.iter().find(|b| b.name == "Personal").unwrap();

    let path = write_statement(
        &temp_dir,
        "statement.csv",
        &[("01", "Rent", "-1200.00"), ("02", "Mystery", "-1.00")],
    );
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    let mut candidates = outcome.transactions.into_iter();

    ctx.categorize_service
        .commit(USER, candidates.next().unwrap(), Some(personal.id.clone()))
        .await
        .unwrap();
    ctx.categorize_service
        .commit(USER, candidates.next().unwrap(), None)
        .await
        .unwrap();

    let summaries = ctx.summary_service.grouped_by_bucket(USER).await.unwrap();
    // Three default buckets plus the uncategorized group
    assert_eq!(summaries.len(), 4);

    let personal_group = summaries
        .iter()
        .find(|s| s.category.as_ref().map(|c| c.name.as_str()) == Some("Personal"))
        .unwrap();
    assert_eq!(personal_group.transactions.len(), 1);
    assert_eq!(personal_group.total, Decimal::new(-120000, 2));

    let uncategorized = summaries.last().unwrap();
    assert!(uncategorized.category.is_none());
    assert_eq!(uncategorized.transactions[0].description, "Mystery");
}

#[tokio::test]
async fn test_bucket_rename_and_delete_through_duckdb() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let bucket = ctx
        .bucket_service
        .create(USER, "Groceries", "#22c55e")
        .await
        .unwrap();
    ctx.bucket_service
        .rename(USER, &bucket.id, "Food")
        .await
        .unwrap();

    let listed = ctx.bucket_service.list(USER).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Food");

    ctx.bucket_service.delete(USER, &bucket.id).await.unwrap();
    assert!(ctx.bucket_service.list(USER).await.unwrap().is_empty());
}

// ============================================================================
// Manual mapping path
// ============================================================================

#[tokio::test]
async fn test_unknown_layout_flows_through_manual_mapping() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir).await;

    let year = Utc::now().date_naive().year();
    let path = temp_dir.path().join("odd.csv");
    std::fs::write(
        &path,
        format!("When,What,HowMuch\n{}-01-01,Rent,-1200.00\n", year),
    )
    .unwrap();

    // Detection fails: none of the headers look like any known role
    let outcome = ctx.ingest_service.process_file(&path).unwrap();
    assert!(outcome.mapping.is_none());
    assert!(outcome.transactions.is_empty());

    // Caller supplies the mapping and the same file parses fully
    let ingest = IngestService::new(FormatCatalog::builtin());
    let mapping = bucketeer_core::ColumnMapping {
        date_column: "When".to_string(),
        description_column: "What".to_string(),
        amount_column: "HowMuch".to_string(),
        raw_description_column: None,
    };
    let outcome = ingest.process_file_with_mapping(&path, mapping).unwrap();
    assert_eq!(outcome.transactions.len(), 1);
}
