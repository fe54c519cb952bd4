//! Direct HTTP fetcher for the listing API.
//!
//! Sends the same request the portal's own listing page sends over XHR, with
//! headers that make it look like that page issued it.

mod user_agent;

pub use user_agent::{random_user_agent, resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::Client;
use tracing::debug;

use super::{parse_page_body, FetchError, PageFetcher, Rejection};
use crate::config::Settings;
use crate::tenders::{PageRequest, PageResponse};

/// Accept header sent by the portal's XHR calls.
pub const JSON_ACCEPT: &str = "application/json, text/plain, */*";

/// HTTP client for listing pages.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    api_url: String,
    referer: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `listing_url` is sent as the Referer. `user_agent_config` follows
    /// [`resolve_user_agent`].
    pub fn new(
        api_url: &str,
        listing_url: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            referer: listing_url.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::new(
            &settings.api_url,
            &settings.listing_url,
            settings.request_timeout,
            settings.user_agent.as_deref(),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError> {
        let request = PageRequest::new(page);
        debug!("GET {} page {}", self.api_url, page);

        let start = Instant::now();
        let response = self
            .client
            .get(&self.api_url)
            .query(&request.query_pairs())
            .header(ACCEPT, JSON_ACCEPT)
            .header(REFERER, &self.referer)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        let status = response.status();
        debug!(
            "Page {} answered {} in {}ms",
            page,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(Rejection::Status(status.as_u16()).into());
        }

        let body = response.text().await?;
        parse_page_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_PATH: &str = "/gggi/aspx/Services/Projects.svc/GetProjects";

    async fn client_for(server: &MockServer) -> HttpClient {
        HttpClient::new(
            &format!("{}{}", server.uri(), API_PATH),
            &format!("{}/gggi/aspx/Tenders/Current", server.uri()),
            Duration::from_secs(5),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page_sends_browser_headers_and_params() {
        let server = MockServer::start().await;
        let referer = format!("{}/gggi/aspx/Tenders/Current", server.uri());

        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("iPage", "2"))
            .and(query_param("iPageSize", "50"))
            .and(query_param("strMode", "Current"))
            .and(query_param("OrderBy", "Title"))
            .and(query_param("OrderDirection", "ASC"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .and(header("Referer", referer.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"PageCount": 4, "Data": [{"UniqueID": "A"}, {"UniqueID": "B"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let page = client.fetch_page(2).await.unwrap();
        assert_eq!(page.page_count(), 4);
        assert_eq!(page.items().len(), 2);

        // Accept and User-Agent contain commas, so compare the raw values
        let requests = server.received_requests().await.unwrap();
        let headers = &requests[0].headers;
        assert_eq!(headers.get("accept").unwrap(), JSON_ACCEPT);
        assert_eq!(headers.get("user-agent").unwrap(), USER_AGENT);
        let url = &requests[0].url;
        assert!(url.query_pairs().any(|(k, v)| k == "_" && !v.is_empty()));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Rejected(Rejection::Status(403))));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_html_challenge_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body>Checking your browser...</body></html>"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_page(1).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Rejected(Rejection::NotJson { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Rejected(Rejection::EmptyBody)));
    }

    #[tokio::test]
    async fn test_fetch_page_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"PageCount": 1, "Data": []}"#)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(
            &format!("{}{}", server.uri(), API_PATH),
            &server.uri(),
            Duration::from_millis(100),
            None,
        )
        .unwrap();
        let err = client.fetch_page(1).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_page_connection_refused_is_transport_error() {
        let client = HttpClient::new(
            "http://127.0.0.1:9/GetProjects",
            "http://127.0.0.1:9/",
            Duration::from_secs(2),
            None,
        )
        .unwrap();
        let err = client.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
