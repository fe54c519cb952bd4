//! Web server exposing the tender export.
//!
//! Provides:
//! - a landing page linking to the download
//! - `/download-excel`, which runs a full aggregation and returns XLSX
//! - `/api/tenders`, the same rows as JSON

mod handlers;
mod routes;
mod templates;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::scrapers::{FetchError, LiveSource, PageSource};

/// Builds a fresh page source for every aggregation run.
pub trait SourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn PageSource>, FetchError>;
}

/// Direct client with browser escalation, configured from settings.
pub struct LiveSources {
    settings: Arc<Settings>,
}

impl LiveSources {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

impl SourceProvider for LiveSources {
    fn open(&self) -> Result<Box<dyn PageSource>, FetchError> {
        Ok(Box::new(LiveSource::from_settings(&self.settings)?))
    }
}

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sources: Arc<dyn SourceProvider>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        Self {
            sources: Arc::new(LiveSources::new(settings.clone())),
            settings,
        }
    }

    pub fn with_sources(settings: Settings, sources: Arc<dyn SourceProvider>) -> Self {
        Self {
            settings: Arc::new(settings),
            sources,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: Settings, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::scrapers::testing::{listing, ScriptedSource};
    use crate::tenders::PageResponse;

    /// Serves the same scripted listing on every run.
    struct FixedPages(Vec<(u32, PageResponse)>);

    impl SourceProvider for FixedPages {
        fn open(&self) -> Result<Box<dyn PageSource>, FetchError> {
            let source = self
                .0
                .iter()
                .fold(ScriptedSource::new(), |s, (n, page)| s.with_page(*n, page.clone()));
            Ok(Box::new(source))
        }
    }

    struct Unconfigurable;

    impl SourceProvider for Unconfigurable {
        fn open(&self) -> Result<Box<dyn PageSource>, FetchError> {
            Err(FetchError::Transport("builder error".to_string()))
        }
    }

    fn setup_test_app(pages: Vec<(u32, PageResponse)>) -> axum::Router {
        let state = AppState::with_sources(Settings::default(), Arc::new(FixedPages(pages)));
        create_router(state)
    }

    fn two_pages() -> Vec<(u32, PageResponse)> {
        vec![
            (1, listing(Some(2), &["A"])),
            (2, listing(Some(2), &["A", "B"])),
        ]
    }

    async fn get(app: axum::Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_links_to_download() {
        let response = get(setup_test_app(two_pages()), "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("href=\"/download-excel\""));
        assert!(html.contains("gggi_tenders.xlsx"));
    }

    #[tokio::test]
    async fn test_download_excel_returns_attachment() {
        let response = get(setup_test_app(two_pages()), "/download-excel").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=gggi_tenders.xlsx"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_download_excel_page_failure_is_bad_gateway() {
        let app = setup_test_app(vec![(1, listing(Some(3), &["A"]))]);
        let response = get(app, "/download-excel").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("page 2"));
    }

    #[tokio::test]
    async fn test_api_tenders_returns_deduplicated_rows() {
        let response = get(setup_test_app(two_pages()), "/api/tenders").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["UniqueID"], "A");
        assert_eq!(rows[1]["UniqueID"], "B");
        assert_eq!(rows[1]["Title"], "Tender B");
    }

    #[tokio::test]
    async fn test_source_setup_failure_is_internal_error() {
        let state = AppState::with_sources(Settings::default(), Arc::new(Unconfigurable));
        let response = get(create_router(state), "/api/tenders").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = get(setup_test_app(two_pages()), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
