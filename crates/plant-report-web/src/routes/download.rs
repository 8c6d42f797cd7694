//! Download route - PDF report generation.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::helpers::{ApiError, ResultExt, RouteResult};
use crate::state::AppState;

pub const GENERATE_ERROR: &str = "An error occurred while generating the PDF report.";
pub const DOWNLOAD_ERROR: &str = "Error downloading the PDF report.";

/// Body of `POST /download`.
///
/// `result` and `image` are what `/analyze` returned. `id` refers to a cached
/// analysis instead; explicit fields take precedence over cached ones.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Render the analysis as a PDF and send it as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> RouteResult<Response> {
    let Json(request) = payload.or_error(GENERATE_ERROR)?;
    let (result, image) = resolve(&state, request).await?;

    let report = state
        .reporter
        .render_report(&result, image.as_deref())
        .await
        .or_error(GENERATE_ERROR)?;

    let file_name = report.file_name().to_string();
    let bytes = report.into_bytes().await.or_error(DOWNLOAD_ERROR)?;
    info!("Sending report {} ({} bytes)", file_name, bytes.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from(bytes))
        .or_error(DOWNLOAD_ERROR)
}

/// Fill in missing fields from the cache when the request names an id.
async fn resolve(
    state: &AppState,
    request: DownloadRequest,
) -> RouteResult<(String, Option<String>)> {
    let DownloadRequest { result, image, id } = request;

    let (Some(id), Some(cache)) = (id, &state.cache) else {
        return Ok((result.unwrap_or_default(), image));
    };
    if result.is_some() && image.is_some() {
        return Ok((result.unwrap_or_default(), image));
    }

    let Some(cached) = cache.get(&id).await else {
        warn!("Unknown or expired analysis id {}", id);
        return Err(ApiError::internal(GENERATE_ERROR));
    };

    Ok((
        result.unwrap_or(cached.result),
        image.or(Some(cached.image)),
    ))
}
