//! Bucketeer Core - statement ingestion and bucket categorization
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Transaction, Category)
//! - **ports**: Trait definitions for external dependencies (Store)
//! - **services**: Business logic orchestration (ingest, dedup, categorize, ...)
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use config::{ColumnMapping, StatementFormat};
pub use domain::result::{Error, RowError};
pub use domain::{Category, NewTransaction, Transaction};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Bucketeer operations
///
/// This is the primary entry point for all business logic. It holds
/// the store, configuration, and all services.
pub struct BucketeerContext {
    pub config: Config,
    pub store: Arc<dyn ports::Store>,
    pub ingest_service: IngestService,
    pub dedup_service: DedupService,
    pub categorize_service: CategorizeService,
    pub bucket_service: BucketService,
    pub summary_service: SummaryService,
}

impl BucketeerContext {
    /// Create a new Bucketeer context rooted at the app directory.
    ///
    /// Demo mode switches to a separate database file so experiments never
    /// touch real data.
    pub async fn new(app_dir: &Path) -> Result<Self> {
        let config = Config::load(app_dir)?;

        let db_filename = if config.demo_mode {
            "demo.duckdb"
        } else {
            "bucketeer.duckdb"
        };

        let db_path = app_dir.join(db_filename);
        let store: Arc<dyn ports::Store> = Arc::new(DuckDbStore::new(&db_path)?);

        // Initialize schema
        store.init().await?;

        Ok(Self::with_store(config, store))
    }

    /// Wire the services over an already-initialized store (used by tests
    /// with the in-memory adapter)
    pub fn with_store(config: Config, store: Arc<dyn ports::Store>) -> Self {
        let catalog = FormatCatalog::with_custom(&config.custom_formats);

        let ingest_service = IngestService::new(catalog);
        let dedup_service = DedupService::new(Arc::clone(&store), config.lookback_years);
        let categorize_service = CategorizeService::new(Arc::clone(&store));
        let bucket_service = BucketService::new(Arc::clone(&store));
        let summary_service = SummaryService::new(Arc::clone(&store), config.lookback_years);

        Self {
            config,
            store,
            ingest_service,
            dedup_service,
            categorize_service,
            bucket_service,
            summary_service,
        }
    }
}
