//! Category (bucket) domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-defined bucket that transactions are sorted into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Opaque store-generated id (transactions hold a weak reference to it)
    pub id: String,
    pub name: String,
    /// Display color, CSS hex notation
    pub color: String,
    /// True for the seeded starter buckets
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, color: impl Into<String>, is_default: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            is_default,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Starter buckets seeded the first time a user has no categories at all
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("Personal", "#3b82f6", true),
        Category::new("Mom & Dad", "#10b981", true),
        Category::new("Family", "#f59e0b", true),
    ]
}
