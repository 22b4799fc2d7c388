//! Categorize service - committing candidates into the store
//!
//! Each commit is an independent, idempotent write keyed by the
//! transaction's natural key: committing the same candidate twice updates
//! the same record instead of duplicating it, which is what makes an
//! interrupted categorization session safely resumable.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{NewTransaction, Transaction};
use crate::ports::Store;

/// Categorization commit/edit operations
pub struct CategorizeService {
    store: Arc<dyn Store>,
}

impl CategorizeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist a candidate with its bucket assignment.
    ///
    /// Returns the natural key the record was stored under. A candidate
    /// that cannot be validated fails this single commit and nothing is
    /// written; the caller surfaces it as retryable.
    pub async fn commit(
        &self,
        user_id: &str,
        candidate: NewTransaction,
        category_id: Option<String>,
    ) -> Result<String> {
        if candidate.description.trim().is_empty() {
            return Err(Error::validation(
                "Transaction must have a non-empty description",
            ));
        }

        let tx = Transaction::from_candidate(candidate, category_id);
        let id = tx.id.clone();
        self.store.put_transaction(user_id, &tx).await?;
        Ok(id)
    }

    /// Move an already-persisted transaction to a different bucket
    pub async fn recategorize(
        &self,
        user_id: &str,
        tx: &Transaction,
        category_id: Option<String>,
    ) -> Result<()> {
        let mut updated = tx.clone();
        updated.category_id = category_id;
        self.store.put_transaction(user_id, &updated).await
    }

    /// Remove a persisted transaction (explicit user action only)
    pub async fn remove(&self, user_id: &str, tx: &Transaction) -> Result<()> {
        self.store
            .delete_transaction(
                user_id,
                tx.partition_year(),
                tx.partition_month(),
                &tx.id,
            )
            .await
    }
}
