//! Store port - document database abstraction
//!
//! Transactions live under a per-user root, partitioned by four-digit year
//! and two-digit month, keyed by the transaction's natural key. Categories
//! live under a separate per-user collection keyed by an opaque generated
//! id. This layout is a compatibility contract; adapters must preserve it.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Category, Transaction};

/// Database store abstraction
///
/// This trait defines all store operations. Implementations (adapters)
/// provide the actual database access logic. Writes are idempotent
/// upserts: re-committing a transaction under the same key updates the
/// existing record rather than duplicating it.
#[async_trait]
pub trait Store: Send + Sync {
    // === Schema ===

    /// Ensure the backing storage exists and is up to date
    async fn init(&self) -> Result<()>;

    // === Transactions ===

    /// Upsert a transaction into its (year, month) partition.
    ///
    /// The adapter assigns created_at on first insert and refreshes
    /// updated_at on every write.
    async fn put_transaction(&self, user_id: &str, tx: &Transaction) -> Result<()>;

    /// Fetch one transaction by partition and id
    async fn get_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<Option<Transaction>>;

    /// List every transaction in one (year, month) partition.
    ///
    /// A partition that was never written to is an empty list, not an error.
    async fn list_partition(&self, user_id: &str, year: i32, month: u32)
        -> Result<Vec<Transaction>>;

    /// Delete one transaction from its partition
    async fn delete_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<()>;

    // === Categories ===

    /// Insert a new category
    async fn add_category(&self, user_id: &str, category: &Category) -> Result<()>;

    /// All categories for a user, ordered by creation time
    async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>>;

    /// Update an existing category (refreshes updated_at)
    async fn update_category(&self, user_id: &str, category: &Category) -> Result<()>;

    /// Delete a category. Transactions referencing it keep their
    /// category_id; the reference is weak by design.
    async fn delete_category(&self, user_id: &str, category_id: &str) -> Result<()>;
}
