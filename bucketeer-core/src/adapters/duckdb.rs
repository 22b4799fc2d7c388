//! DuckDB store implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{Category, RawRow, Transaction};
use crate::migrations::MIGRATIONS;
use crate::ports::Store;

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed implementation of the Store port
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbStore {
    /// Open (or create) the store database.
    ///
    /// Retries with exponential backoff on file locking errors, which can
    /// occur when another process still holds the database during startup.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[bucketeer] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::store(format!("Failed to open database after {} retries", MAX_RETRIES))))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Disable extension autoloading to avoid macOS code signing issues
        // (cached extensions in ~/.duckdb/extensions may have different Team IDs)
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(store_err)?;
        let conn = Connection::open_with_flags(db_path, config).map_err(store_err)?;
        Ok(conn)
    }

    /// Apply any pending embedded migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            if let Some((name, sql)) = MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql") {
                conn.execute_batch(sql).map_err(store_err)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )
                .map_err(store_err)?;
            }
        }

        let mut stmt = conn
            .prepare("SELECT migration_name FROM sys_migrations")
            .map_err(store_err)?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(store_err)?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in MIGRATIONS.iter() {
            if *name == "000_migrations.sql" {
                continue;
            }
            if !applied.contains(&name.to_string()) {
                conn.execute_batch(sql).map_err(store_err)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )
                .map_err(store_err)?;
            }
        }

        Ok(())
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }
}

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::store(e.to_string())
}

/// Column order shared by every transaction SELECT
const TX_COLUMNS: &str = "transaction_id, tx_date, description, amount, \
                          raw_description, original_data, category_id, created_at, updated_at";

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let description: String = row.get(2)?;
    let amount_str: String = row.get(3)?;
    let raw_description: Option<String> = row.get(4)?;
    let original_json: Option<String> = row.get(5)?;
    let category_id: Option<String> = row.get(6)?;
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    Ok(Transaction {
        id,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        description,
        amount: Decimal::from_str(&amount_str).unwrap_or_default(),
        raw_description,
        original_data: original_json
            .and_then(|s| serde_json::from_str::<RawRow>(&s).ok())
            .unwrap_or_default(),
        category_id,
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl Store for DuckDbStore {
    async fn init(&self) -> Result<()> {
        self.run_migrations()
    }

    async fn put_transaction(&self, user_id: &str, tx: &Transaction) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        let original_json = serde_json::to_string(&tx.original_data)?;

        conn.execute(
            r#"
            INSERT INTO sys_transactions (
                user_id, year, month, transaction_id, tx_date, description,
                amount, raw_description, original_data, category_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, year, month, transaction_id) DO UPDATE SET
                tx_date = excluded.tx_date,
                description = excluded.description,
                amount = excluded.amount,
                raw_description = excluded.raw_description,
                original_data = excluded.original_data,
                category_id = excluded.category_id,
                updated_at = excluded.updated_at
            "#,
            params![
                user_id,
                tx.partition_year(),
                tx.partition_month(),
                &tx.id,
                tx.date.format("%Y-%m-%d").to_string(),
                &tx.description,
                tx.amount.to_string(),
                &tx.raw_description,
                original_json,
                &tx.category_id,
                &now,
                &now,
            ],
        )
        .map_err(store_err)?;

        Ok(())
    }

    async fn get_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<Option<Transaction>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM sys_transactions
                 WHERE user_id = ? AND year = ? AND month = ? AND transaction_id = ?",
                TX_COLUMNS
            ))
            .map_err(store_err)?;

        let tx = stmt
            .query_row(params![user_id, year, month, id], row_to_transaction)
            .ok();

        Ok(tx)
    }

    async fn list_partition(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Transaction>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM sys_transactions
                 WHERE user_id = ? AND year = ? AND month = ?
                 ORDER BY tx_date DESC",
                TX_COLUMNS
            ))
            .map_err(store_err)?;

        let transactions = stmt
            .query_map(params![user_id, year, month], row_to_transaction)
            .map_err(store_err)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(transactions)
    }

    async fn delete_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "DELETE FROM sys_transactions
             WHERE user_id = ? AND year = ? AND month = ? AND transaction_id = ?",
            params![user_id, year, month, id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn add_category(&self, user_id: &str, category: &Category) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO sys_categories (
                user_id, category_id, name, color, is_default, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                &category.id,
                &category.name,
                &category.color,
                category.is_default,
                &now,
                &now,
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT category_id, name, color, is_default, created_at, updated_at
                 FROM sys_categories WHERE user_id = ?
                 ORDER BY created_at, category_id",
            )
            .map_err(store_err)?;

        let categories = stmt
            .query_map([user_id], |row| {
                let created_str: String = row.get(4)?;
                let updated_str: String = row.get(5)?;
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    is_default: row.get(3)?,
                    created_at: parse_timestamp(&created_str),
                    updated_at: parse_timestamp(&updated_str),
                })
            })
            .map_err(store_err)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(categories)
    }

    async fn update_category(&self, user_id: &str, category: &Category) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        let changed = conn
            .execute(
                "UPDATE sys_categories SET name = ?, color = ?, updated_at = ?
                 WHERE user_id = ? AND category_id = ?",
                params![&category.name, &category.color, &now, user_id, &category.id],
            )
            .map_err(store_err)?;

        if changed == 0 {
            return Err(Error::not_found(format!("Category {}", category.id)));
        }
        Ok(())
    }

    async fn delete_category(&self, user_id: &str, category_id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "DELETE FROM sys_categories WHERE user_id = ? AND category_id = ?",
            params![user_id, category_id],
        )
        .map_err(store_err)?;
        Ok(())
    }
}
