//! Transaction domain model

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw statement row as parsed from the file: column name to cell text.
///
/// Retained verbatim on the persisted transaction for audit.
pub type RawRow = BTreeMap<String, String>;

/// A parsed statement row that has not been persisted yet.
///
/// Gains an identity (the natural key) and server-assigned timestamps only
/// when committed through the categorization flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    /// Original statement text, when the layout carries a cleaned-up
    /// description in a separate column (e.g. Monarch exports)
    pub raw_description: Option<String>,
    /// The source row exactly as it appeared in the file
    pub original_data: RawRow,
}

impl NewTransaction {
    /// The content-derived identifier this transaction will be stored under.
    pub fn natural_key(&self) -> String {
        natural_key(self.date, &self.description, self.amount)
    }
}

/// A persisted financial transaction scoped to one user's partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Natural key derived from (date, description, amount)
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub raw_description: Option<String>,
    pub original_data: RawRow,
    /// Weak reference to a bucket; None while uncategorized
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a persisted record from a candidate and its bucket assignment.
    ///
    /// Timestamps are placeholders here; the store adapter assigns the real
    /// created_at/updated_at at write time.
    pub fn from_candidate(candidate: NewTransaction, category_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: candidate.natural_key(),
            date: candidate.date,
            description: candidate.description,
            amount: candidate.amount,
            raw_description: candidate.raw_description,
            original_data: candidate.original_data,
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Year component of this transaction's storage partition
    pub fn partition_year(&self) -> i32 {
        use chrono::Datelike;
        self.date.year()
    }

    /// Month component of this transaction's storage partition (1-based)
    pub fn partition_month(&self) -> u32 {
        use chrono::Datelike;
        self.date.month()
    }
}

/// Derive the deterministic content-based identifier for a transaction.
///
/// Same (date, description, amount) triple always yields the same key; the
/// time component is deliberately ignored so two postings on the same
/// calendar day with identical description and amount collapse to one key.
///
/// The key is the first 8 bytes of SHA-256 over
/// `YYYY-MM-DD|description|amount`, hex-encoded (16 chars). Wide enough
/// that collisions between distinct triples are negligible in practice.
pub fn natural_key(date: NaiveDate, description: &str, amount: Decimal) -> String {
    let date_str = date.format("%Y-%m-%d").to_string();

    // Normalize amount: fixed two decimal places, and treat -0 as 0
    let amount = if amount == Decimal::ZERO {
        Decimal::ZERO
    } else {
        amount
    };
    let amount_str = format!("{:.2}", amount);

    let input = format!("{}|{}|{}", date_str, description, amount_str);

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
