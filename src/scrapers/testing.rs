//! Scripted fetchers and sources shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{FetchError, PageFailure, PageFetcher, PageSource, Rejection};
use crate::tenders::{PageResponse, RawItem};

/// Page with the given count and one item per id.
pub(crate) fn listing(page_count: Option<u32>, ids: &[&str]) -> PageResponse {
    let items = ids
        .iter()
        .map(|id| RawItem::new(json!({ "UniqueID": id, "Title": format!("Tender {}", id) })))
        .collect();
    PageResponse::new(page_count, items)
}

/// Fetcher answering from a fixed page table; unknown pages are rejected
/// with HTTP 403.
pub(crate) struct ScriptedFetcher {
    name: &'static str,
    pages: HashMap<u32, PageResponse>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            pages: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_page(mut self, page: u32, response: PageResponse) -> Self {
        self.pages.insert(page, response);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(&page)
            .cloned()
            .ok_or(FetchError::Rejected(Rejection::Status(403)))
    }
}

/// Source answering from a fixed page table, recording every request.
pub(crate) struct ScriptedSource {
    pages: HashMap<u32, PageResponse>,
    delays: HashMap<u32, Duration>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self {
            pages: HashMap::new(),
            delays: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_page(mut self, page: u32, response: PageResponse) -> Self {
        self.pages.insert(page, response);
        self
    }

    pub(crate) fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub(crate) fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, page: u32) -> Result<PageResponse, PageFailure> {
        self.requested.lock().unwrap().push(page);
        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        self.pages.get(&page).cloned().ok_or(PageFailure {
            page,
            direct: FetchError::Rejected(Rejection::Status(403)),
            escalated: FetchError::Browser("scripted failure".to_string()),
        })
    }
}
