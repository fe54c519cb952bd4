//! One isolated Chromium process per escalated fetch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::BrowserEngineConfig;
use crate::scrapers::FetchError;

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        FetchError::Browser(e.to_string())
    }
}

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Find a Chrome executable: configured path, well-known locations, then PATH.
pub fn find_chrome(configured: Option<&Path>) -> Result<PathBuf, FetchError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(FetchError::Browser(
        "Chrome/Chromium not found; install it or set CHROME_PATH".to_string(),
    ))
}

/// A launched browser with a throwaway profile directory.
///
/// Dropping the session aborts the CDP handler task and drops the
/// [`Browser`], which kills the child process; [`BrowserSession::shutdown`]
/// is the orderly path.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    /// Launch Chromium with a fresh profile (empty cookie jar).
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self, FetchError> {
        let chrome_path = find_chrome(config.executable.as_deref())?;
        let profile = tempfile::Builder::new()
            .prefix("tenderfetch-profile-")
            .tempdir()
            .map_err(|e| FetchError::Browser(format!("Failed to create profile dir: {}", e)))?;

        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| FetchError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    pub async fn new_page(&mut self) -> Result<Page, FetchError> {
        Ok(self.browser.new_page("about:blank").await?)
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(mut self) {
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            if let Err(e) = self.browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
        })
        .await;
        if closed.is_err() {
            debug!("Browser did not exit in time, killing it");
        }
        self.handler.abort();
        debug!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Navigate to a URL with timeout handling.
pub async fn navigate_to_url(page: &Page, url: &str, timeout_secs: u64) -> Result<(), FetchError> {
    info!("Navigating to {}", url);
    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| FetchError::Browser(format!("Invalid URL: {}", e)))?;

    tokio::time::timeout(Duration::from_secs(timeout_secs), page.execute(nav_params))
        .await
        .map_err(|_| FetchError::Timeout {
            stage: "navigation",
            secs: timeout_secs,
        })?
        .map_err(|e| FetchError::Browser(format!("Navigation failed for {}: {}", url, e)))?;

    Ok(())
}

/// Tracks in-flight requests of a page from CDP network events.
///
/// Subscribe before navigating so the page's first requests are counted.
pub struct NetworkIdle {
    sent: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkIdle {
    pub async fn subscribe(page: &Page) -> Result<Self, FetchError> {
        Ok(Self {
            sent: page.event_listener::<EventRequestWillBeSent>().await?,
            finished: page.event_listener::<EventLoadingFinished>().await?,
            failed: page.event_listener::<EventLoadingFailed>().await?,
        })
    }

    /// Wait until no request has been in flight for `window`, giving up after
    /// `bound_secs`.
    pub async fn wait(&mut self, window: Duration, bound_secs: u64) -> Result<(), FetchError> {
        tokio::time::timeout(Duration::from_secs(bound_secs), self.settle(window))
            .await
            .map_err(|_| FetchError::Timeout {
                stage: "network quiescence",
                secs: bound_secs,
            })
    }

    async fn settle(&mut self, window: Duration) {
        let mut in_flight: HashSet<String> = HashSet::new();
        loop {
            tokio::select! {
                Some(event) = self.sent.next() => {
                    in_flight.insert(event.request_id.inner().clone());
                }
                Some(event) = self.finished.next() => {
                    in_flight.remove(event.request_id.inner());
                }
                Some(event) = self.failed.next() => {
                    in_flight.remove(event.request_id.inner());
                }
                _ = tokio::time::sleep(window), if in_flight.is_empty() => {
                    debug!("Network idle for {}ms", window.as_millis());
                    return;
                }
                // All event streams closed: the page is gone, later steps report it
                else => return,
            }
        }
    }
}
