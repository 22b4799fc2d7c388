//! Bucketeer CLI - sort bank statements into buckets from your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{buckets, demo, import, logs, summary};

/// Bucketeer - statement ingestion and bucket categorization
#[derive(Parser)]
#[command(name = "bkt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a statement file and categorize the new transactions
    Import {
        /// Path to a .csv, .xlsx, or .xls statement export
        file: PathBuf,
        /// Screen only; show what would be imported without writing
        #[arg(long)]
        preview: bool,
        /// Output as JSON (implies --preview)
        #[arg(long)]
        json: bool,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
        /// Column name for the transaction date (manual mapping)
        #[arg(long)]
        date_column: Option<String>,
        /// Column name for the description (manual mapping)
        #[arg(long)]
        description_column: Option<String>,
        /// Column name for the amount (manual mapping)
        #[arg(long)]
        amount_column: Option<String>,
        /// Column name holding the original statement text (manual mapping)
        #[arg(long)]
        raw_description_column: Option<String>,
    },

    /// Manage buckets (categories)
    Buckets {
        #[command(subcommand)]
        command: buckets::BucketCommands,
    },

    /// Show transactions grouped by bucket
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Keep piped output plain
    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            preview,
            json,
            user,
            date_column,
            description_column,
            amount_column,
            raw_description_column,
        } => {
            import::run(
                file,
                preview,
                json,
                user,
                date_column,
                description_column,
                amount_column,
                raw_description_column,
            )
            .await
        }
        Commands::Buckets { command } => buckets::run(command).await,
        Commands::Summary { json, user } => summary::run(json, user).await,
        Commands::Logs { command } => logs::run(command),
        Commands::Demo { command } => demo::run(command),
    }
}
