//! Summary service - per-bucket aggregation for the dashboard view

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{Category, Transaction};
use crate::ports::Store;

/// How many transactions the grouped view considers at most
const SUMMARY_SCAN_LIMIT: usize = 1000;

/// One bucket's slice of the dashboard: its transactions newest first and
/// their signed total. `category == None` is the uncategorized group.
#[derive(Debug, Serialize)]
pub struct BucketSummary {
    pub category: Option<Category>,
    pub transactions: Vec<Transaction>,
    pub total: Decimal,
}

/// Read-side aggregation over the partitioned store
pub struct SummaryService {
    store: Arc<dyn Store>,
    lookback_years: i32,
}

impl SummaryService {
    pub fn new(store: Arc<dyn Store>, lookback_years: i32) -> Self {
        Self {
            store,
            lookback_years: lookback_years.max(1),
        }
    }

    /// Most recent transactions across all partitions, newest first.
    ///
    /// Walks partitions newest-first and stops early once `limit` items
    /// are collected; a failing partition is skipped like an empty one.
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        let current_year = Utc::now().date_naive().year();
        let mut transactions = Vec::new();

        'years: for offset in 0..self.lookback_years {
            let year = current_year - offset;
            for month in (1..=12u32).rev() {
                match self.store.list_partition(user_id, year, month).await {
                    Ok(items) => transactions.extend(items),
                    Err(_) => continue,
                }
                if transactions.len() >= limit {
                    break 'years;
                }
            }
        }

        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions.truncate(limit);
        Ok(transactions)
    }

    /// Transactions grouped per bucket, with uncategorized ones last.
    ///
    /// Buckets keep their creation order; a bucket with no transactions
    /// still appears with an empty group so the view can render it.
    pub async fn grouped_by_bucket(&self, user_id: &str) -> Result<Vec<BucketSummary>> {
        let categories = self.store.list_categories(user_id).await?;
        let transactions = self.recent(user_id, SUMMARY_SCAN_LIMIT).await?;

        let mut by_category: HashMap<String, Vec<Transaction>> = HashMap::new();
        let mut uncategorized = Vec::new();

        let known: std::collections::HashSet<&str> =
            categories.iter().map(|c| c.id.as_str()).collect();

        for tx in transactions {
            match tx.category_id.as_deref() {
                // A reference to a deleted bucket degrades to uncategorized
                Some(id) if known.contains(id) => {
                    by_category.entry(id.to_string()).or_default().push(tx)
                }
                _ => uncategorized.push(tx),
            }
        }

        let mut summaries = Vec::new();
        for category in categories {
            let transactions = by_category.remove(&category.id).unwrap_or_default();
            let total = transactions.iter().map(|t| t.amount).sum();
            summaries.push(BucketSummary {
                category: Some(category),
                transactions,
                total,
            });
        }

        if !uncategorized.is_empty() {
            let total = uncategorized.iter().map(|t| t.amount).sum();
            summaries.push(BucketSummary {
                category: None,
                transactions: uncategorized,
                total,
            });
        }

        Ok(summaries)
    }
}
