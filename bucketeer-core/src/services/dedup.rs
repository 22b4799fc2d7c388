//! Dedup service - duplicate screening against the partitioned store
//!
//! Before categorization, a candidate batch is checked against everything
//! the user already has persisted. Membership is by natural key, so the
//! screen is purely content-based and works offline from the original
//! statement file.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{NewTransaction, Transaction};
use crate::ports::Store;

/// Result of screening a candidate batch against the store.
///
/// `existing_count + new_count` always equals the input batch size, and
/// `new_transactions` preserves the batch's original order.
#[derive(Debug, Serialize)]
pub struct DedupOutcome {
    pub new_transactions: Vec<NewTransaction>,
    pub existing_count: usize,
    pub new_count: usize,
}

/// Duplicate filter over the year/month-partitioned store
pub struct DedupService {
    store: Arc<dyn Store>,
    /// Partition scan window in years, current year included
    lookback_years: i32,
}

impl DedupService {
    pub fn new(store: Arc<dyn Store>, lookback_years: i32) -> Self {
        Self {
            store,
            lookback_years: lookback_years.max(1),
        }
    }

    /// Union every (year, month) partition in the lookback window.
    ///
    /// A partition that does not exist or fails to read counts as empty;
    /// a transient store error must never sink the whole fetch.
    pub async fn existing_transactions(&self, user_id: &str) -> Vec<Transaction> {
        let current_year = Utc::now().date_naive().year();
        let mut transactions = Vec::new();

        for offset in 0..self.lookback_years {
            let year = current_year - offset;
            for month in 1..=12u32 {
                match self.store.list_partition(user_id, year, month).await {
                    Ok(items) => transactions.extend(items),
                    Err(_) => continue,
                }
            }
        }

        transactions
    }

    /// Partition a candidate batch into new vs already-existing.
    ///
    /// Candidates whose natural key is already stored are excluded from
    /// the output; everything else passes through in input order.
    pub async fn screen(
        &self,
        user_id: &str,
        candidates: Vec<NewTransaction>,
    ) -> Result<DedupOutcome> {
        let existing = self.existing_transactions(user_id).await;

        let existing_ids: HashSet<&str> = existing.iter().map(|tx| tx.id.as_str()).collect();

        let total = candidates.len();
        let mut new_transactions = Vec::new();
        for candidate in candidates {
            if existing_ids.contains(candidate.natural_key().as_str()) {
                continue;
            }
            new_transactions.push(candidate);
        }

        let new_count = new_transactions.len();
        Ok(DedupOutcome {
            new_transactions,
            existing_count: total - new_count,
            new_count,
        })
    }
}
