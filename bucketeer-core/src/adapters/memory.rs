//! In-memory store implementation
//!
//! Keeps the full partition layout in process memory. Used as the test
//! double for service tests — including simulating per-partition read
//! failures, which the file-backed adapter cannot do on demand.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::result::{Error, Result};
use crate::domain::{Category, Transaction};
use crate::ports::Store;

type PartitionKey = (String, i32, u32);

#[derive(Default)]
struct Inner {
    /// (user, year, month) -> id -> transaction
    transactions: HashMap<PartitionKey, BTreeMap<String, Transaction>>,
    /// user -> categories in insertion order
    categories: HashMap<String, Vec<Category>>,
    /// Partitions that error on read, for failure-tolerance tests
    failing: HashSet<PartitionKey>,
}

/// In-memory implementation of the Store port
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make one partition fail every read, to exercise the duplicate
    /// filter's continue-on-error behavior
    pub fn fail_partition(&self, user_id: &str, year: i32, month: u32) {
        self.inner
            .lock()
            .unwrap()
            .failing
            .insert((user_id.to_string(), year, month));
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn put_transaction(&self, user_id: &str, tx: &Transaction) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            user_id.to_string(),
            tx.partition_year(),
            tx.partition_month(),
        );
        let partition = inner.transactions.entry(key).or_default();

        let now = Utc::now();
        let mut stored = tx.clone();
        stored.updated_at = now;
        // created_at survives an upsert of an existing record
        stored.created_at = partition
            .get(&tx.id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        partition.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn get_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<Option<Transaction>> {
        let inner = self.inner.lock().unwrap();
        let key = (user_id.to_string(), year, month);
        if inner.failing.contains(&key) {
            return Err(Error::store("partition unavailable"));
        }
        Ok(inner
            .transactions
            .get(&key)
            .and_then(|p| p.get(id))
            .cloned())
    }

    async fn list_partition(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Transaction>> {
        let inner = self.inner.lock().unwrap();
        let key = (user_id.to_string(), year, month);
        if inner.failing.contains(&key) {
            return Err(Error::store("partition unavailable"));
        }
        Ok(inner
            .transactions
            .get(&key)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_transaction(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        id: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (user_id.to_string(), year, month);
        if let Some(partition) = inner.transactions.get_mut(&key) {
            partition.remove(id);
        }
        Ok(())
    }

    async fn add_category(&self, user_id: &str, category: &Category) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .categories
            .entry(user_id.to_string())
            .or_default()
            .push(category.clone());
        Ok(())
    }

    async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.categories.get(user_id).cloned().unwrap_or_default())
    }

    async fn update_category(&self, user_id: &str, category: &Category) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let categories = inner
            .categories
            .get_mut(user_id)
            .ok_or_else(|| Error::not_found(format!("Category {}", category.id)))?;

        let existing = categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or_else(|| Error::not_found(format!("Category {}", category.id)))?;

        let created_at = existing.created_at;
        *existing = category.clone();
        existing.created_at = created_at;
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_category(&self, user_id: &str, category_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(categories) = inner.categories.get_mut(user_id) {
            categories.retain(|c| c.id != category_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTransaction, RawRow};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn sample_tx() -> Transaction {
        Transaction::from_candidate(
            NewTransaction {
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                description: "Coffee".to_string(),
                amount: Decimal::new(-450, 2),
                raw_description: None,
                original_data: RawRow::new(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryStore::new();
        let tx = sample_tx();
        store.put_transaction("u1", &tx).await.unwrap();

        let fetched = store
            .get_transaction("u1", 2024, 1, &tx.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.description, "Coffee");
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let store = MemoryStore::new();
        let tx = sample_tx();
        store.put_transaction("u1", &tx).await.unwrap();
        let first = store
            .get_transaction("u1", 2024, 1, &tx.id)
            .await
            .unwrap()
            .unwrap();

        store.put_transaction("u1", &tx).await.unwrap();
        let second = store
            .get_transaction("u1", 2024, 1, &tx.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_failing_partition_errors_on_read() {
        let store = MemoryStore::new();
        store.fail_partition("u1", 2024, 1);
        assert!(store.list_partition("u1", 2024, 1).await.is_err());
        // Other partitions are unaffected
        assert!(store.list_partition("u1", 2024, 2).await.is_ok());
    }
}
