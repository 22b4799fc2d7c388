//! Logs command - view and manage the event log

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_app_dir;
use bucketeer_core::{EntryPoint, LoggingService};
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
    },
    /// Show log statistics and database path
    Stats,
}

fn get_logging_service() -> Result<LoggingService> {
    let app_dir = get_app_dir();
    std::fs::create_dir_all(&app_dir)?;
    LoggingService::new(&app_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List { limit, errors, json } => {
            let service = get_logging_service()?;
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Institution", "Command", "Error"]);
            for entry in entries {
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.event,
                    entry.institution.unwrap_or_default(),
                    entry.command.unwrap_or_default(),
                    entry.error_message.unwrap_or_default(),
                ]);
            }
            println!("{}", table);
            Ok(())
        }
        LogsCommands::Clear { older_than_days } => {
            let service = get_logging_service()?;
            let cutoff_ms = chrono::Utc::now().timestamp_millis()
                - (older_than_days as i64) * 24 * 60 * 60 * 1000;
            let deleted = service.delete_before(cutoff_ms)?;
            output::success(&format!("Deleted {} log entries", deleted));
            Ok(())
        }
        LogsCommands::Stats => {
            let service = get_logging_service()?;
            println!("Entries: {}", service.count()?);
            println!("Database: {}", service.db_path().display().to_string().cyan());
            Ok(())
        }
    }
}
