//! In-page API call issued from the listing page's script context.

use serde::Deserialize;
use tracing::warn;

use crate::scrapers::http_client::JSON_ACCEPT;
use crate::scrapers::{parse_page_body, FetchError};
use crate::tenders::PageResponse;

/// What the in-page fetch hands back to Rust.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct InPageResult {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Build the script that fetches `url` with the page's cookies and returns
/// the raw response text.
pub fn in_page_fetch_script(url: &str) -> String {
    // serde_json string literals are valid JS string literals
    let url = serde_json::Value::String(url.to_string()).to_string();
    let accept = serde_json::Value::String(JSON_ACCEPT.to_string()).to_string();
    format!(
        r#"
        (async () => {{
            try {{
                const res = await fetch({url}, {{
                    method: 'GET',
                    credentials: 'include',
                    headers: {{
                        'Accept': {accept},
                        'X-Requested-With': 'XMLHttpRequest'
                    }}
                }});
                return {{ status: res.status, body: await res.text() }};
            }} catch (e) {{
                return {{ error: e.toString() }};
            }}
        }})()
        "#
    )
}

/// Turn the script result into a page, applying the same JSON sniff as the
/// direct path.
pub fn interpret(result: InPageResult) -> Result<PageResponse, FetchError> {
    if let Some(error) = result.error {
        return Err(FetchError::Browser(format!("in-page fetch failed: {}", error)));
    }
    if let Some(status) = result.status {
        if !(200..300).contains(&status) {
            warn!("In-page fetch answered HTTP {}", status);
        }
    }
    parse_page_body(result.body.as_deref().unwrap_or_default())
}
