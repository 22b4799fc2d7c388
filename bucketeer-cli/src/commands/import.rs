//! Import command - ingest a statement, screen duplicates, categorize

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::{ProgressBar, ProgressStyle};

use bucketeer_core::services::ingest::IngestOutcome;
use bucketeer_core::{ColumnMapping, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    file: PathBuf,
    preview: bool,
    json: bool,
    user: Option<String>,
    date_column: Option<String>,
    description_column: Option<String>,
    amount_column: Option<String>,
    raw_description_column: Option<String>,
) -> Result<()> {
    let ctx = get_context().await?;
    let logger = get_logger();
    let user = user.unwrap_or_else(|| ctx.config.user_id.clone());

    // Manual mapping: all three required columns or none
    let manual_mapping = match (&date_column, &description_column, &amount_column) {
        (Some(date), Some(description), Some(amount)) => Some(ColumnMapping {
            date_column: date.clone(),
            description_column: description.clone(),
            amount_column: amount.clone(),
            raw_description_column: raw_description_column.clone(),
        }),
        (None, None, None) => None,
        _ => anyhow::bail!(
            "Manual mapping needs --date-column, --description-column, and --amount-column together"
        ),
    };

    let outcome = match manual_mapping {
        Some(mapping) => ctx.ingest_service.process_file_with_mapping(&file, mapping)?,
        None => ctx.ingest_service.process_file(&file)?,
    };

    let institution = ctx.ingest_service.catalog().identify(&outcome.headers);

    if outcome.mapping.is_none() {
        log_event(
            &logger,
            LogEvent::new("mapping_detection_failed").with_command("import"),
        );
        output::warning("Could not detect the statement layout from these headers:");
        for header in &outcome.headers {
            println!("  {}", header);
        }
        println!();
        output::info(
            "Re-run with --date-column, --description-column, and --amount-column to map manually",
        );
        return Err(bucketeer_core::Error::NoMappingDetected.into());
    }

    log_event(&logger, {
        let mut event = LogEvent::new("statement_ingested").with_command("import");
        if let Some(name) = &institution {
            event = event.with_institution(name.clone());
        }
        event
    });

    if !json {
        for error in &outcome.errors {
            output::warning(&format!("  {}", error));
        }
        if let Some(name) = &institution {
            output::info(&format!("Detected layout: {}", name));
        }
    }

    // Screen the batch against everything already stored
    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner());
        pb.set_message("Screening against existing transactions...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });

    let parsed_count = outcome.transactions.len();
    let IngestOutcome {
        transactions,
        errors,
        ..
    } = outcome;
    let screened = ctx.dedup_service.screen(&user, transactions).await?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    log_event(
        &logger,
        LogEvent::new("dedup_screened").with_command("import"),
    );

    if json {
        let payload = serde_json::json!({
            "parsed": parsed_count,
            "existingCount": screened.existing_count,
            "newCount": screened.new_count,
            "newTransactions": screened.new_transactions,
            "errors": errors,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "Parsed {} transactions: {} new, {} already stored",
        parsed_count, screened.new_count, screened.existing_count
    );

    if screened.new_transactions.is_empty() {
        output::success("Nothing new to categorize.");
        return Ok(());
    }

    if preview {
        println!("{}", "PREVIEW MODE - No changes applied".yellow());
        println!();

        let mut table = output::create_table();
        table.set_header(vec!["Date", "Amount", "Description"]);
        for tx in screened.new_transactions.iter().take(20) {
            table.add_row(vec![
                tx.date.to_string(),
                output::format_amount(tx.amount),
                tx.description.clone(),
            ]);
        }
        println!("{}", table);
        if screened.new_transactions.len() > 20 {
            println!("... and {} more", screened.new_transactions.len() - 20);
        }
        return Ok(());
    }

    categorize_wizard(&ctx, &logger, &user, screened.new_transactions).await
}

/// One-at-a-time bucket assignment. Each pick is committed immediately,
/// so quitting halfway loses nothing: a re-import screens the committed
/// subset out and resumes where the user left off.
async fn categorize_wizard(
    ctx: &bucketeer_core::BucketeerContext,
    logger: &Option<bucketeer_core::LoggingService>,
    user: &str,
    transactions: Vec<bucketeer_core::NewTransaction>,
) -> Result<()> {
    let buckets = ctx.bucket_service.ensure_defaults(user).await?;

    let mut choices: Vec<String> = buckets.iter().map(|b| b.name.clone()).collect();
    choices.push("Skip".to_string());
    choices.push("Quit".to_string());
    let skip_index = buckets.len();
    let quit_index = buckets.len() + 1;

    let total = transactions.len();
    let mut committed = 0usize;
    let mut skipped = 0usize;

    for (index, tx) in transactions.into_iter().enumerate() {
        println!();
        println!(
            "{} {}  {}  {}",
            format!("[{}/{}]", index + 1, total).bold(),
            tx.date,
            output::format_amount(tx.amount),
            tx.description
        );
        if let Some(raw) = &tx.raw_description {
            println!("        {}", raw.dimmed());
        }

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Bucket")
            .items(&choices)
            .default(0)
            .interact()?;

        if selection == quit_index {
            output::warning("Stopping here. Re-run the import to pick up the rest.");
            break;
        }
        if selection == skip_index {
            skipped += 1;
            continue;
        }

        let bucket = &buckets[selection];
        match ctx
            .categorize_service
            .commit(user, tx, Some(bucket.id.clone()))
            .await
        {
            Ok(_) => committed += 1,
            Err(e) => {
                log_event(
                    logger,
                    LogEvent::new("commit_failed")
                        .with_command("import")
                        .with_error(e.to_string()),
                );
                output::error(&format!("Could not save this transaction: {}. Try again.", e));
                skipped += 1;
            }
        }
    }

    log_event(
        logger,
        LogEvent::new("categorization_finished").with_command("import"),
    );

    println!();
    output::success(&format!(
        "Done: {} categorized, {} skipped.",
        committed, skipped
    ));
    Ok(())
}
