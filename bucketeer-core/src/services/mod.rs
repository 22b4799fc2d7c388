//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod bucket;
mod categorize;
mod dedup;
pub mod ingest;
pub mod logging;
mod summary;

pub use bucket::BucketService;
pub use categorize::CategorizeService;
pub use dedup::{DedupOutcome, DedupService};
pub use ingest::{FormatCatalog, IngestOutcome, IngestService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use summary::{BucketSummary, SummaryService};
