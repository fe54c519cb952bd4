//! Page aggregation: discover the page count, walk every page in order and
//! keep the first row seen for each `UniqueID`.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::model::{OutputRow, RawItem};
use crate::config::Settings;
use crate::scrapers::{PageFailure, PageSource};

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(transparent)]
    Page(#[from] PageFailure),
    #[error("aggregation cancelled before page {before_page}")]
    Cancelled { before_page: u32 },
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collected {
    pub rows: Vec<OutputRow>,
    pub pages: u32,
    pub duplicates: usize,
    pub escalations: usize,
}

/// First-seen-wins deduplication scoped to one run.
///
/// Absent and null IDs share the `None` key, so only the first of them is kept.
#[derive(Debug, Default)]
pub struct Dedup {
    seen: HashSet<Option<String>>,
    rows: Vec<OutputRow>,
    duplicates: usize,
}

impl Dedup {
    /// Returns whether the item produced a new row.
    pub fn push(&mut self, item: &RawItem) -> bool {
        if self.seen.insert(item.unique_id()) {
            self.rows.push(item.to_row());
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Drives a [`PageSource`] across the whole listing.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    concurrency: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Aggregator {
    /// `concurrency` bounds the number of pages 2..N in flight; 1 fetches
    /// strictly one after another.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.page_concurrency)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every page and return the deduplicated rows.
    ///
    /// The first page failure aborts the run and no rows are returned.
    /// `cancel` is checked before each page fetch is started.
    pub async fn collect_all<S>(
        &self,
        source: &S,
        cancel: &CancellationToken,
    ) -> Result<Collected, AggregationError>
    where
        S: PageSource + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(AggregationError::Cancelled { before_page: 1 });
        }

        let first = source.fetch(1).await?;
        if !first.has_page_count() {
            debug!("Page 1 carries no PageCount, treating listing as a single page");
        }
        let page_count = first.page_count();
        info!("Listing has {} page(s)", page_count);

        let mut dedup = Dedup::default();
        for item in first.items() {
            dedup.push(item);
        }

        // buffered() yields in input order, so the dedup pass below sees
        // pages in increasing page number regardless of completion order
        let mut remaining = stream::iter(2..=page_count)
            .map(|page| async move {
                if cancel.is_cancelled() {
                    return Err(AggregationError::Cancelled { before_page: page });
                }
                let response = source.fetch(page).await?;
                Ok((page, response))
            })
            .buffered(self.concurrency);

        while let Some(result) = remaining.next().await {
            let (page, response) = result?;
            let before = dedup.len();
            for item in response.items() {
                dedup.push(item);
            }
            debug!(
                "Page {}/{}: {} item(s), {} new",
                page,
                page_count,
                response.items().len(),
                dedup.len() - before
            );
        }

        info!(
            "Collected {} row(s) from {} page(s) ({} duplicate(s) skipped)",
            dedup.len(),
            page_count,
            dedup.duplicates
        );

        Ok(Collected {
            rows: dedup.rows,
            pages: page_count,
            duplicates: dedup.duplicates,
            escalations: source.escalations(),
        })
    }
}
