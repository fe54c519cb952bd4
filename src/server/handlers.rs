//! Request handlers.

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use rust_xlsxwriter::XlsxError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::templates::IndexTemplate;
use super::AppState;
use crate::export::{write_workbook, XLSX_CONTENT_TYPE};
use crate::scrapers::FetchError;
use crate::tenders::{AggregationError, Aggregator, Collected};

/// Failures surfaced to HTTP clients as a status and a one-line message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not set up upstream client: {0}")]
    Setup(#[source] FetchError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("could not build spreadsheet: {0}")]
    Export(#[from] XlsxError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Aggregation(AggregationError::Page(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Aggregation(AggregationError::Cancelled { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Setup(_) | ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        let message = match &self {
            ApiError::Aggregation(AggregationError::Page(_)) => {
                format!("Upstream fetch failed: {}", self)
            }
            _ => self.to_string(),
        };
        (self.status(), message).into_response()
    }
}

/// Run one aggregation with a fresh source. The run is cancelled if the
/// request future is dropped before it finishes.
async fn collect(state: &AppState) -> Result<Collected, ApiError> {
    let source = state.sources.open().map_err(ApiError::Setup)?;
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let collected = Aggregator::from_settings(&state.settings)
        .collect_all(source.as_ref(), &cancel)
        .await?;

    info!(
        "Collected {} tender(s) over {} page(s), {} escalation(s)",
        collected.rows.len(),
        collected.pages,
        collected.escalations
    );
    Ok(collected)
}

pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let template = IndexTemplate {
        title: "GGGI tenders",
        download_path: "/download-excel",
        filename: &state.settings.download_filename,
        json_path: "/api/tenders",
        listing_url: &state.settings.listing_url,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Fetch every page and return the rows as an XLSX attachment.
pub async fn download_excel(State(state): State<AppState>) -> Result<Response, ApiError> {
    let collected = collect(&state).await?;
    let bytes = write_workbook(&collected.rows)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", state.settings.download_filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Same rows as the download, as JSON.
pub async fn api_tenders(State(state): State<AppState>) -> Result<Response, ApiError> {
    let collected = collect(&state).await?;
    Ok(Json(collected.rows).into_response())
}
