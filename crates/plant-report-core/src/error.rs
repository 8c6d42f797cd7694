use thiserror::Error;

/// Unified error type for plant-report-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Analyzer operations (API requests, responses, rate limiting, safety blocks)
/// - Upload handling
/// - Image decoding
/// - Report rendering and saving
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Analyzer Errors
    // ==========================================================================
    /// Analyzer API request failed
    #[error("analyzer request failed: {0}")]
    AnalyzerRequest(String),

    /// Invalid response from the analyzer API
    #[error("invalid analyzer response: {0}")]
    AnalyzerInvalidResponse(String),

    /// Rate limited by the analyzer API
    #[error("analyzer rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    AnalyzerRateLimited { retry_after: Option<u64> },

    /// API key not configured for a provider that needs one
    #[error("analyzer API key not configured")]
    AnalyzerMissingApiKey,

    /// Analyzer request timed out
    #[error("analyzer request timed out")]
    AnalyzerTimeout,

    /// The model refused to answer (safety filter, prohibited content, ...)
    #[error("analysis blocked by the model: {0}")]
    AnalyzerBlocked(String),

    // ==========================================================================
    // Upload Errors
    // ==========================================================================
    /// No file was supplied in the upload
    #[error("no image file was uploaded")]
    MissingUpload,

    // ==========================================================================
    // Image Errors
    // ==========================================================================
    /// Image payload could not be decoded (bad base64 or unknown format)
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    // ==========================================================================
    // Report Errors
    // ==========================================================================
    /// Failed to lay out or encode the PDF report
    #[error("failed to render PDF report: {0}")]
    PdfRender(String),

    /// Failed to write the PDF report
    #[error("failed to save PDF report: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
