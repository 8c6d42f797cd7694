//! Analyze route - image upload and plant identification.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use plant_report_core::{Analysis, Error};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::helpers::{ApiError, ResultExt, RouteResult};
use crate::state::AppState;

/// Multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub analysis: Analysis,
    /// Cache id for `/download`, when the cache is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Identify the plant in an uploaded image.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> RouteResult<Json<AnalyzeResponse>> {
    let mut multipart = multipart.or_internal_error()?;

    while let Some(field) = multipart.next_field().await.or_internal_error()? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(ToString::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|mime| mime.essence_str().to_string())
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let filename = field.file_name().unwrap_or("upload").to_string();

        let data = field.bytes().await.or_internal_error()?;

        let analysis = state
            .reporter
            .analyze_upload(&data, &mime_type)
            .await
            .map_err(|e| {
                error!("Analysis of {} failed: {}", filename, e);
                ApiError::internal(e.to_string())
            })?;

        info!(
            "Analyzed upload {} ({} bytes, {}) with {}",
            filename,
            data.len(),
            mime_type,
            state.reporter.analyzer().name()
        );

        let id = match &state.cache {
            Some(cache) => Some(cache.insert(analysis.clone()).await),
            None => None,
        };

        return Ok(Json(AnalyzeResponse { analysis, id }));
    }

    Err(ApiError::internal(Error::MissingUpload.to_string()))
}
