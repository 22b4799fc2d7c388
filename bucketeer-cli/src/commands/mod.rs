//! CLI command implementations

pub mod buckets;
pub mod demo;
pub mod import;
pub mod logs;
pub mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bucketeer_core::{BucketeerContext, EntryPoint, LogEvent, LoggingService};

/// Get the bucketeer directory from environment or default
pub fn get_app_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BUCKETEER_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".bucketeer")
    }
}

/// Get or create the bucketeer context
pub async fn get_context() -> Result<BucketeerContext> {
    let app_dir = get_app_dir();

    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create bucketeer directory: {:?}", app_dir))?;

    BucketeerContext::new(&app_dir)
        .await
        .context("Failed to initialize bucketeer context")
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let app_dir = get_app_dir();
    std::fs::create_dir_all(&app_dir).ok()?;
    LoggingService::new(&app_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}
