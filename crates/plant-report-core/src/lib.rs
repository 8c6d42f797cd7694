//! Plant Report Core Library
//!
//! This library provides the core functionality for identifying plants from photos:
//! - Vision model backends (Gemini, OpenAI-compatible)
//! - Transient upload and report storage with guaranteed cleanup
//! - PDF report rendering
//! - An optional short-lived cache of analyses

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod datauri;
pub mod error;
pub mod report;
pub mod storage;
pub mod util;

pub use analyzer::{AnalyzerInfo, GeminiAnalyzer, ImageAnalyzer, InlineImage, OpenAiAnalyzer, create_analyzer};
pub use cache::AnalysisCache;
pub use config::{
    AnalyzerConfig, AnalyzerProvider, AppConfig, CacheConfig, ReportConfig, StorageConfig,
    DEFAULT_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_PROMPT,
};
pub use error::{Error, Result};
pub use report::{ReportContent, ReportRenderer};
pub use storage::{ReportFile, ReportStore, StoredUpload, UploadStore};

use std::io::{BufWriter, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What `/analyze` hands back: the model's answer and the image as a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub result: String,
    pub image: String,
}

/// High-level service that combines all components
pub struct PlantReporter {
    analyzer: Arc<dyn ImageAnalyzer>,
    uploads: UploadStore,
    reports: ReportStore,
    renderer: ReportRenderer,
    prompt: String,
}

impl PlantReporter {
    /// Create a reporter with the analyzer named in the configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let analyzer = create_analyzer(&config.analyzer)?;
        Ok(Self::with_analyzer(analyzer, config))
    }

    /// Create with a custom analyzer
    pub fn with_analyzer(analyzer: Arc<dyn ImageAnalyzer>, config: &AppConfig) -> Self {
        Self {
            analyzer,
            uploads: UploadStore::new(config.storage.upload_dir.clone()),
            reports: ReportStore::new(config.storage.reports_dir.clone()),
            renderer: ReportRenderer::new(config.report.clone()),
            prompt: config.analyzer.prompt.clone(),
        }
    }

    pub fn analyzer(&self) -> &Arc<dyn ImageAnalyzer> {
        &self.analyzer
    }

    pub const fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub const fn reports(&self) -> &ReportStore {
        &self.reports
    }

    /// Send image bytes to the model, entirely in memory.
    pub async fn analyze(&self, bytes: &[u8], mime_type: &str) -> Result<Analysis> {
        let image = InlineImage::new(mime_type, datauri::encode_base64(bytes));

        info!(
            "Analyzing {} image ({} bytes) with {}",
            mime_type,
            bytes.len(),
            self.analyzer.name()
        );
        let result = self.analyzer.describe(&self.prompt, &image).await?;
        debug!("Analysis returned {} chars", result.len());

        Ok(Analysis {
            result,
            image: image.to_data_uri(),
        })
    }

    /// Analyze an upload by way of the upload directory.
    ///
    /// The file is written, read back and analyzed; it is removed on every
    /// exit path.
    pub async fn analyze_upload(&self, bytes: &[u8], mime_type: &str) -> Result<Analysis> {
        let upload = self.uploads.persist(bytes).await?;
        let stored = upload.read().await?;

        let analysis = self.analyze(&stored, mime_type).await;

        let path = upload.path().display().to_string();
        if let Err(e) = upload.close() {
            warn!("Failed to delete upload {}: {}", path, e);
        }

        analysis
    }

    /// Render a report into the reports directory.
    ///
    /// `image` may be a data URI or bare base64; an empty string counts as
    /// no image. The returned file is fully written and synced, and is
    /// deleted once dropped or consumed.
    pub async fn render_report(&self, result: &str, image: Option<&str>) -> Result<ReportFile> {
        self.reports.ensure_dir().await?;

        let image = image
            .filter(|s| !s.trim().is_empty())
            .map(datauri::decode_image_payload)
            .transpose()?;

        let config = self.renderer.config();
        let content = ReportContent {
            title: config.title.clone(),
            date: util::format_today(&config.date_format)?,
            body: result.to_string(),
            image,
        };

        let reports = self.reports.clone();
        let renderer = self.renderer.clone();

        tokio::task::spawn_blocking(move || -> Result<ReportFile> {
            let (file, report) = reports.create()?;

            let mut writer = BufWriter::new(file);
            renderer.render_to(&content, &mut writer)?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
            file.sync_all()?;

            info!("Wrote report {}", report.path().display());
            Ok(report)
        })
        .await
        .map_err(|e| Error::PdfRender(format!("Render task failed: {e}")))?
    }
}
