//! Single-page diagnostics.

use anyhow::Context;
use clap::ValueEnum;
use console::style;

use crate::config::Settings;
use crate::scrapers::{BrowserFetcher, HttpClient, LiveSource, PageFetcher, PageSource};
use crate::tenders::PageResponse;

/// Fetch path for `probe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Via {
    /// Plain HTTP request only
    Direct,
    /// Headless browser only
    Browser,
    /// Direct first, browser on failure
    Resilient,
}

pub async fn cmd_probe(settings: &Settings, page: u32, via: Via) -> anyhow::Result<()> {
    anyhow::ensure!(page >= 1, "Pages are numbered from 1");

    println!(
        "{} Probing page {} ({:?})",
        style("→").cyan(),
        page,
        via
    );

    let response: PageResponse = match via {
        Via::Direct => {
            let client = HttpClient::from_settings(settings)?;
            client.fetch_page(page).await?
        }
        Via::Browser => BrowserFetcher::from_settings(settings).fetch_page(page).await?,
        Via::Resilient => {
            let source = LiveSource::from_settings(settings)?;
            let response = source
                .fetch(page)
                .await
                .with_context(|| format!("Page {} failed on every path", page))?;
            if source.escalations() > 0 {
                println!("  {} direct request was rejected, browser succeeded", style("!").yellow());
            }
            response
        }
    };

    let ids: Vec<String> = response
        .items()
        .iter()
        .take(5)
        .map(|item| item.unique_id().unwrap_or_else(|| "-".to_string()))
        .collect();

    println!(
        "  {} PageCount: {}{}",
        style("✓").green(),
        response.page_count(),
        if response.has_page_count() { "" } else { " (not reported)" }
    );
    println!("    Items: {}", response.items().len());
    if !ids.is_empty() {
        println!("    First IDs: {}", ids.join(", "));
    }

    Ok(())
}
