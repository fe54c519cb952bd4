//! Direct-first page source with one escalation per page.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{BrowserFetcher, FetchError, HttpClient, PageFailure, PageFetcher, PageSource};
use crate::config::Settings;
use crate::tenders::PageResponse;

/// What to do after the direct attempt for a page.
#[derive(Debug)]
pub enum Step {
    Done(PageResponse),
    Escalate(FetchError),
}

/// Any direct failure, transport or rejection, escalates. Nothing else is
/// retried.
pub fn next_step(outcome: Result<PageResponse, FetchError>) -> Step {
    match outcome {
        Ok(page) => Step::Done(page),
        Err(e) => Step::Escalate(e),
    }
}

/// Tries `direct` for every page and falls back to `escalated` at most once.
pub struct ResilientPageSource<D, E> {
    direct: D,
    escalated: Option<E>,
    escalations: AtomicUsize,
}

/// The production pairing.
pub type LiveSource = ResilientPageSource<HttpClient, BrowserFetcher>;

impl<D: PageFetcher, E: PageFetcher> ResilientPageSource<D, E> {
    pub fn new(direct: D, escalated: E) -> Self {
        Self {
            direct,
            escalated: Some(escalated),
            escalations: AtomicUsize::new(0),
        }
    }

    /// Direct attempts only; a rejected page fails immediately.
    pub fn direct_only(direct: D) -> Self {
        Self {
            direct,
            escalated: None,
            escalations: AtomicUsize::new(0),
        }
    }
}

impl LiveSource {
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let direct = HttpClient::from_settings(settings)?;
        if settings.browser.enabled {
            Ok(Self::new(direct, BrowserFetcher::from_settings(settings)))
        } else {
            debug!("Browser escalation disabled by configuration");
            Ok(Self::direct_only(direct))
        }
    }
}

#[async_trait]
impl<D: PageFetcher, E: PageFetcher> PageSource for ResilientPageSource<D, E> {
    async fn fetch(&self, page: u32) -> Result<PageResponse, PageFailure> {
        let direct = match next_step(self.direct.fetch_page(page).await) {
            Step::Done(response) => return Ok(response),
            Step::Escalate(e) => e,
        };

        let Some(escalated) = &self.escalated else {
            error!("Page {}: {} fetch failed: {}", page, self.direct.name(), direct);
            return Err(PageFailure {
                page,
                direct,
                escalated: FetchError::EscalationDisabled,
            });
        };

        warn!(
            "Page {}: {} fetch failed ({}), retrying via {}",
            page,
            self.direct.name(),
            direct,
            escalated.name()
        );
        self.escalations.fetch_add(1, Ordering::Relaxed);

        match escalated.fetch_page(page).await {
            Ok(response) => {
                info!("Page {} recovered via {}", page, escalated.name());
                Ok(response)
            }
            Err(e) => {
                error!("Page {}: {} fetch failed too: {}", page, escalated.name(), e);
                Err(PageFailure {
                    page,
                    direct,
                    escalated: e,
                })
            }
        }
    }

    fn escalations(&self) -> usize {
        self.escalations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::{listing, ScriptedFetcher};
    use crate::scrapers::Rejection;

    #[test]
    fn test_next_step_escalates_any_failure() {
        assert!(matches!(next_step(Ok(listing(Some(1), &[]))), Step::Done(_)));
        assert!(matches!(
            next_step(Err(FetchError::Transport("reset".into()))),
            Step::Escalate(_)
        ));
        assert!(matches!(
            next_step(Err(Rejection::EmptyBody.into())),
            Step::Escalate(_)
        ));
    }

    #[tokio::test]
    async fn test_direct_success_never_escalates() {
        let source = ResilientPageSource::new(
            ScriptedFetcher::new("direct").with_page(1, listing(Some(1), &["A"])),
            ScriptedFetcher::new("browser"),
        );

        let page = source.fetch(1).await.unwrap();
        assert_eq!(page.items().len(), 1);
        assert_eq!(source.escalations(), 0);
        assert_eq!(source.escalated.as_ref().unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_page_recovers_via_escalation() {
        let source = ResilientPageSource::new(
            ScriptedFetcher::new("direct"),
            ScriptedFetcher::new("browser").with_page(2, listing(Some(3), &["B"])),
        );

        let page = source.fetch(2).await.unwrap();
        assert_eq!(page.items()[0].unique_id().as_deref(), Some("B"));
        assert_eq!(source.direct.calls(), 1);
        assert_eq!(source.escalated.as_ref().unwrap().calls(), 1);
        assert_eq!(source.escalations(), 1);
    }

    #[tokio::test]
    async fn test_both_failing_reports_both_errors() {
        let source = ResilientPageSource::new(
            ScriptedFetcher::new("direct"),
            ScriptedFetcher::new("browser"),
        );

        let failure = source.fetch(5).await.unwrap_err();
        assert_eq!(failure.page, 5);
        assert!(matches!(
            failure.direct,
            FetchError::Rejected(Rejection::Status(403))
        ));
        assert!(matches!(
            failure.escalated,
            FetchError::Rejected(Rejection::Status(403))
        ));
        // one attempt each, no further retries
        assert_eq!(source.direct.calls(), 1);
        assert_eq!(source.escalated.as_ref().unwrap().calls(), 1);
    }

    #[tokio::test]
    async fn test_direct_only_fails_without_escalating() {
        let source: ResilientPageSource<_, ScriptedFetcher> =
            ResilientPageSource::direct_only(ScriptedFetcher::new("direct"));

        let failure = source.fetch(1).await.unwrap_err();
        assert!(matches!(failure.escalated, FetchError::EscalationDisabled));
        assert_eq!(source.escalations(), 0);
    }
}
