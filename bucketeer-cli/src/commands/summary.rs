//! Summary command - transactions grouped by bucket

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;

pub async fn run(json: bool, user: Option<String>) -> Result<()> {
    let ctx = get_context().await?;
    let user = user.unwrap_or_else(|| ctx.config.user_id.clone());

    let summaries = ctx.summary_service.grouped_by_bucket(&user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No transactions yet. Run {} to get started.", "bkt import".cyan());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Bucket", "Transactions", "Total"]);

    let mut grand_total = Decimal::ZERO;
    for summary in &summaries {
        let name = summary
            .category
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "(uncategorized)".to_string());
        grand_total += summary.total;
        table.add_row(vec![
            name,
            summary.transactions.len().to_string(),
            output::format_amount(summary.total),
        ]);
    }
    println!("{}", table);
    println!("Net across buckets: {}", output::format_amount(grand_total));
    Ok(())
}
