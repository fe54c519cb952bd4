//! Export to a local spreadsheet file.

use std::path::PathBuf;

use anyhow::Context;
use console::style;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::export::write_workbook;
use crate::scrapers::LiveSource;
use crate::tenders::Aggregator;

/// Fetch all pages and write the workbook. Ctrl+C stops before the next page.
pub async fn cmd_export(settings: &Settings, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&settings.download_filename));
    let source = LiveSource::from_settings(settings).context("Failed to set up HTTP client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} Interrupted, stopping after the current page", style("!").yellow());
            on_interrupt.cancel();
        }
    });

    println!(
        "{} Fetching tender listing from {}",
        style("→").cyan(),
        settings.api_url
    );
    let result = Aggregator::from_settings(settings)
        .collect_all(&source, &cancel)
        .await;
    interrupt.abort();

    let collected = match result {
        Ok(collected) => collected,
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), e);
            return Err(e.into());
        }
    };

    let bytes = write_workbook(&collected.rows).context("Failed to build spreadsheet")?;
    tokio::fs::write(&output, bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "  {} {} tender(s) from {} page(s) written to {}",
        style("✓").green(),
        collected.rows.len(),
        collected.pages,
        output.display()
    );
    if collected.duplicates > 0 {
        println!("    {} duplicate(s) skipped", collected.duplicates);
    }
    if collected.escalations > 0 {
        println!(
            "    {} page(s) needed the browser fallback",
            collected.escalations
        );
    }

    Ok(())
}
