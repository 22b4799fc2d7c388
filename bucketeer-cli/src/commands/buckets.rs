//! Buckets command - category management

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum BucketCommands {
    /// List buckets (seeds the starter set on first use)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
    },
    /// Create a new bucket
    Add {
        /// Bucket name
        name: String,
        /// Display color (CSS hex)
        #[arg(long, default_value = "#6b7280")]
        color: String,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
    },
    /// Rename a bucket
    Rename {
        /// Bucket id (see `bkt buckets list`)
        id: String,
        /// New name
        name: String,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete a bucket (its transactions become uncategorized)
    Remove {
        /// Bucket id
        id: String,
        /// Override the partition owner from settings
        #[arg(long)]
        user: Option<String>,
    },
}

pub async fn run(command: BucketCommands) -> Result<()> {
    let ctx = get_context().await?;
    let default_user = ctx.config.user_id.clone();

    match command {
        BucketCommands::List { json, user } => {
            let user = user.unwrap_or(default_user);
            let buckets = ctx.bucket_service.ensure_defaults(&user).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Id", "Name", "Color", "Default"]);
            for bucket in buckets {
                table.add_row(vec![
                    bucket.id,
                    bucket.name,
                    bucket.color,
                    if bucket.is_default { "yes".to_string() } else { String::new() },
                ]);
            }
            println!("{}", table);
            Ok(())
        }
        BucketCommands::Add { name, color, user } => {
            let user = user.unwrap_or(default_user);
            let bucket = ctx.bucket_service.create(&user, &name, &color).await?;
            output::success(&format!("Created bucket '{}' ({})", bucket.name, bucket.id));
            Ok(())
        }
        BucketCommands::Rename { id, name, user } => {
            let user = user.unwrap_or(default_user);
            ctx.bucket_service.rename(&user, &id, &name).await?;
            output::success(&format!("Renamed bucket to '{}'", name));
            Ok(())
        }
        BucketCommands::Remove { id, user } => {
            let user = user.unwrap_or(default_user);
            ctx.bucket_service.delete(&user, &id).await?;
            println!(
                "Bucket removed. Its transactions now show under {}.",
                "uncategorized".yellow()
            );
            Ok(())
        }
    }
}
