//! Browser engine configuration types.
//!
//! Always compiled (rather than behind `#[cfg(feature = "browser")]`) so
//! config parsing works without the browser feature.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Fall back to the browser when a direct request is rejected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Browser engine type.
    #[serde(default)]
    pub engine: BrowserEngineType,

    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Upper bound in seconds for each of navigation, network quiescence and
    /// the in-page API call.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long the listing page must stay without in-flight requests before
    /// it counts as settled.
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,

    /// Chrome/Chromium executable. Discovered automatically when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            engine: BrowserEngineType::default(),
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            network_idle_ms: default_network_idle_ms(),
            executable: None,
            chrome_args: Vec::new(),
        }
    }
}

pub fn default_enabled() -> bool {
    true
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_network_idle_ms() -> u64 {
    500
}

/// Browser engine types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineType {
    /// Chromium with automation-masking scripts (default).
    #[default]
    Stealth,

    /// No stealth patches (for debugging).
    Standard,
}
