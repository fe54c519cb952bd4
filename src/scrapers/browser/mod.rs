//! Browser-based fetcher for bot-protected listing endpoints.
//!
//! Launches a headless Chromium through chromiumoxide (CDP), lets the
//! human-facing listing page set whatever cookies and tokens it needs, then
//! issues the API call from inside that page. Every fetch gets its own
//! browser process and profile; nothing is shared between calls.

mod config;
mod script;
#[cfg(feature = "browser")]
mod session;
mod stealth;

pub use config::{BrowserEngineConfig, BrowserEngineType};
pub use script::{in_page_fetch_script, interpret, InPageResult};
pub use stealth::STEALTH_SCRIPTS;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use std::time::Duration;
#[cfg(feature = "browser")]
use tracing::{debug, info};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::Page;

#[cfg(feature = "browser")]
use session::{navigate_to_url, BrowserSession, NetworkIdle};

use super::http_client::resolve_user_agent;
use super::{FetchError, PageFetcher};
use crate::config::Settings;
use crate::tenders::{PageRequest, PageResponse};

/// Escalated fetcher driving a headless browser.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    config: BrowserEngineConfig,
    api_url: String,
    listing_url: String,
    user_agent: String,
}

impl BrowserFetcher {
    pub fn new(
        config: BrowserEngineConfig,
        api_url: &str,
        listing_url: &str,
        user_agent_config: Option<&str>,
    ) -> Self {
        Self {
            config,
            api_url: api_url.to_string(),
            listing_url: listing_url.to_string(),
            user_agent: resolve_user_agent(user_agent_config),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.browser.clone(),
            &settings.api_url,
            &settings.listing_url,
            settings.user_agent.as_deref(),
        )
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }

    fn page_url(&self, page: u32) -> Result<String, FetchError> {
        PageRequest::new(page)
            .url(&self.api_url)
            .map(String::from)
            .map_err(|e| FetchError::Browser(format!("Invalid API URL {}: {}", self.api_url, e)))
    }
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Steps 2-3 of an escalated fetch. The session is torn down by the caller.
    async fn fetch_in_page(&self, page: &Page, api_url: &str) -> Result<PageResponse, FetchError> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await?;

        let mut idle = NetworkIdle::subscribe(page).await?;
        navigate_to_url(page, &self.listing_url, self.config.timeout).await?;
        idle.wait(
            Duration::from_millis(self.config.network_idle_ms),
            self.config.timeout,
        )
        .await?;

        if self.config.engine == BrowserEngineType::Stealth {
            apply_stealth(page).await;
        }

        debug!("Issuing in-page fetch for {}", api_url);
        let evaluation = tokio::time::timeout(
            Duration::from_secs(self.config.timeout),
            page.evaluate(in_page_fetch_script(api_url)),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            stage: "in-page fetch",
            secs: self.config.timeout,
        })??;

        let result: InPageResult = evaluation
            .into_value()
            .map_err(|e| FetchError::Browser(format!("Unexpected in-page fetch result: {}", e)))?;

        interpret(result)
    }
}

/// Apply stealth evasion scripts to a page.
#[cfg(feature = "browser")]
async fn apply_stealth(page: &Page) {
    debug!("Applying stealth scripts");
    for script in STEALTH_SCRIPTS {
        if let Err(e) = page.evaluate(script.to_string()).await {
            debug!("Stealth script injection skipped: {}", e);
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError> {
        let api_url = self.page_url(page)?;
        self.fetch_escalated(page, &api_url).await
    }
}

impl BrowserFetcher {
    #[cfg(feature = "browser")]
    async fn fetch_escalated(&self, page: u32, api_url: &str) -> Result<PageResponse, FetchError> {
        info!("Fetching page {} through browser session", page);

        let mut session = BrowserSession::launch(&self.config).await?;
        let result = match session.new_page().await {
            Ok(page) => self.fetch_in_page(&page, api_url).await,
            Err(e) => Err(e),
        };
        session.shutdown().await;
        result
    }

    #[cfg(not(feature = "browser"))]
    async fn fetch_escalated(&self, _page: u32, _api_url: &str) -> Result<PageResponse, FetchError> {
        Err(FetchError::Browser(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}
