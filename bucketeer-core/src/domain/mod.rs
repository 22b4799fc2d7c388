//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod category;
mod transaction;
pub mod result;

pub use category::{default_categories, Category};
pub use transaction::{natural_key, NewTransaction, RawRow, Transaction};
