//! Bucket service - category management

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{default_categories, Category};
use crate::ports::Store;

/// Category (bucket) management
pub struct BucketService {
    store: Arc<dyn Store>,
}

impl BucketService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Seed the starter buckets if the user has none yet, then return the
    /// full list
    pub async fn ensure_defaults(&self, user_id: &str) -> Result<Vec<Category>> {
        let existing = self.store.list_categories(user_id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        for category in default_categories() {
            self.store.add_category(user_id, &category).await?;
        }
        self.store.list_categories(user_id).await
    }

    /// All buckets, ordered by creation time
    pub async fn list(&self, user_id: &str) -> Result<Vec<Category>> {
        self.store.list_categories(user_id).await
    }

    /// Create a user-defined bucket
    pub async fn create(&self, user_id: &str, name: &str, color: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Bucket name cannot be empty"));
        }

        let category = Category::new(name, color, false);
        self.store.add_category(user_id, &category).await?;
        Ok(category)
    }

    /// Rename an existing bucket
    pub async fn rename(&self, user_id: &str, category_id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::validation("Bucket name cannot be empty"));
        }

        let mut category = self
            .find(user_id, category_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Bucket {}", category_id)))?;
        category.name = new_name.to_string();
        self.store.update_category(user_id, &category).await
    }

    /// Delete a bucket. Transactions referencing it are left in place;
    /// they surface as uncategorized in the summary.
    pub async fn delete(&self, user_id: &str, category_id: &str) -> Result<()> {
        self.store.delete_category(user_id, category_id).await
    }

    async fn find(&self, user_id: &str, category_id: &str) -> Result<Option<Category>> {
        Ok(self
            .store
            .list_categories(user_id)
            .await?
            .into_iter()
            .find(|c| c.id == category_id))
    }
}
