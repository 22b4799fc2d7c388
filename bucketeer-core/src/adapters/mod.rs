//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Store port (the real persistence layer)
//! - An in-memory store used as the test double, with per-partition
//!   failure injection

pub mod duckdb;
pub mod memory;
