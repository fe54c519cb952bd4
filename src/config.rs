//! Configuration management for tenderfetch using the prefer crate.
//!
//! A config file (discovered by prefer or passed with `--config`) supplies
//! optional overrides; [`Settings`] is the resolved, immutable view every
//! run is built from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scrapers::BrowserEngineConfig;

/// Listing API queried for each page.
pub const DEFAULT_API_URL: &str =
    "https://in-tendhost.co.uk/gggi/aspx/Services/Projects.svc/GetProjects";

/// Human-facing page the browser loads before replaying the API call.
pub const DEFAULT_LISTING_URL: &str = "https://in-tendhost.co.uk/gggi/aspx/Tenders/Current";

pub const DEFAULT_DOWNLOAD_FILENAME: &str = "gggi_tenders.xlsx";

pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub listing_url: String,
    /// User agent for direct requests and the browser override.
    /// `None` uses the built-in Chrome UA; "impersonate" picks a random one.
    pub user_agent: Option<String>,
    /// Per-request timeout for direct fetches.
    pub request_timeout: Duration,
    /// Pages fetched at once after page 1 (1 = sequential).
    pub page_concurrency: usize,
    /// Filename offered by the download route.
    pub download_filename: String,
    /// Address the web server binds to.
    pub bind: String,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            user_agent: None,
            request_timeout: Duration::from_secs(30),
            page_concurrency: 1,
            download_filename: DEFAULT_DOWNLOAD_FILENAME.to_string(),
            bind: DEFAULT_BIND.to_string(),
            browser: BrowserEngineConfig::default(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Browser escalation settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when nothing is found or the file is unreadable.
    pub async fn load() -> Self {
        let discovered = match prefer::load("tenderfetch").await {
            Ok(pref_config) => pref_config.source_path().map(|p| p.to_path_buf()),
            Err(_) => None,
        };

        let Some(path) = discovered else {
            tracing::debug!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load_from_path(&path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// The format follows the file extension (TOML, YAML, otherwise JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).context("Failed to parse TOML config")?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
            }
            _ => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Overlay every value present in the file onto `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref url) = self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(ref url) = self.listing_url {
            settings.listing_url = url.clone();
        }
        if self.user_agent.is_some() {
            settings.user_agent = self.user_agent.clone();
        }
        if let Some(secs) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.page_concurrency {
            settings.page_concurrency = n.max(1);
        }
        if let Some(ref name) = self.download_filename {
            settings.download_filename = name.clone();
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Apply environment overrides. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

    if let Some(url) = var("TENDERFETCH_API_URL") {
        tracing::debug!("Using TENDERFETCH_API_URL from environment: {}", url);
        settings.api_url = url;
    }
    if let Some(url) = var("TENDERFETCH_LISTING_URL") {
        tracing::debug!("Using TENDERFETCH_LISTING_URL from environment: {}", url);
        settings.listing_url = url;
    }
    if let Some(bind) = var("TENDERFETCH_BIND") {
        tracing::debug!("Using TENDERFETCH_BIND from environment: {}", bind);
        settings.bind = bind;
    }
    if let Some(path) = var("CHROME_PATH") {
        tracing::debug!("Using CHROME_PATH from environment: {}", path);
        settings.browser.executable = Some(PathBuf::from(path));
    }
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
///
/// An explicit `config_path` that cannot be read is an error; a discovered
/// one is skipped with a warning.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config)> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    Ok((settings, config))
}
