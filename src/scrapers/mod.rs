//! Page fetchers for the tender listing API.
//!
//! Two leaf fetchers share the [`PageFetcher`] contract: a plain HTTP client
//! and a headless browser that first establishes a session on the listing
//! page. [`ResilientPageSource`] composes them into the [`PageSource`] the
//! aggregator consumes.

pub mod browser;
pub mod http_client;
pub mod resilient;
#[cfg(test)]
pub(crate) mod testing;

pub use browser::{BrowserEngineConfig, BrowserEngineType, BrowserFetcher};
pub use http_client::HttpClient;
pub use resilient::{next_step, LiveSource, ResilientPageSource, Step};

use async_trait::async_trait;
use thiserror::Error;

use crate::tenders::PageResponse;

/// Why upstream answered but the answer was not a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("empty response body")]
    EmptyBody,
    #[error("response is not JSON (starts with {preview:?})")]
    NotJson { preview: String },
}

/// Failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream rejected request: {0}")]
    Rejected(#[from] Rejection),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
    #[error("invalid page JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("browser escalation is disabled")]
    EscalationDisabled,
}

impl FetchError {
    /// Connection-level failure (no usable response arrived).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::Browser(_) | FetchError::Timeout { .. }
        )
    }

    /// Upstream responded with something other than a listing page.
    pub fn is_rejection(&self) -> bool {
        matches!(self, FetchError::Rejected(_) | FetchError::Decode(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Both attempts for a page failed.
#[derive(Debug, Error)]
#[error("page {page} could not be fetched (direct: {direct}; browser: {escalated})")]
pub struct PageFailure {
    pub page: u32,
    pub direct: FetchError,
    pub escalated: FetchError,
}

/// One way of retrieving a listing page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError>;
}

/// Source of listing pages as seen by the aggregator.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, page: u32) -> Result<PageResponse, PageFailure>;

    /// Number of pages that needed the escalated path so far.
    fn escalations(&self) -> usize {
        0
    }
}

/// Check the body looks like a JSON object and parse it.
///
/// Upstream serves HTML challenge pages with status 200, so the leading
/// character is checked before handing the body to serde.
pub fn parse_page_body(body: &str) -> Result<PageResponse, FetchError> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Err(Rejection::EmptyBody.into());
    }
    if !trimmed.starts_with('{') {
        let preview: String = trimmed.chars().take(40).collect();
        return Err(Rejection::NotJson { preview }.into());
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_body_accepts_json() {
        let page = parse_page_body("  \n{\"PageCount\": 3, \"Data\": [{\"UniqueID\": \"A\"}]}")
            .unwrap();
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.items().len(), 1);
    }

    #[test]
    fn test_parse_page_body_rejects_html() {
        let err = parse_page_body("<!DOCTYPE html><html>challenge</html>").unwrap_err();
        assert!(matches!(
            err,
            FetchError::Rejected(Rejection::NotJson { ref preview }) if preview.starts_with("<!DOCTYPE")
        ));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_parse_page_body_rejects_empty() {
        let err = parse_page_body("   \r\n").unwrap_err();
        assert!(matches!(err, FetchError::Rejected(Rejection::EmptyBody)));
    }

    #[test]
    fn test_parse_page_body_bad_json_is_decode_error() {
        let err = parse_page_body("{\"PageCount\": ").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_classification() {
        assert!(FetchError::Transport("dns".into()).is_transport());
        assert!(FetchError::Timeout {
            stage: "navigation",
            secs: 30
        }
        .is_transport());
        assert!(!FetchError::Rejected(Rejection::Status(403)).is_transport());
    }
}
