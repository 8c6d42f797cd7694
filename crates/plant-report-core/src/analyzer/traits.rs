use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Information about an analyzer backend
#[derive(Debug, Clone)]
pub struct AnalyzerInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this analyzer requires an API key
    pub requires_api_key: bool,
}

/// An image passed inline in the request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// MIME type of the original upload (e.g. `image/jpeg`)
    pub mime_type: String,
    /// Standard base64 of the image bytes
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// `data:<mime>;base64,<data>`
    pub fn to_data_uri(&self) -> String {
        crate::datauri::to_data_uri(&self.mime_type, &self.data)
    }
}

/// Trait for generative vision backends
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Get information about this analyzer
    fn info(&self) -> AnalyzerInfo;

    /// Get the analyzer name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Ask the model about an image and return its text answer
    async fn describe(&self, prompt: &str, image: &InlineImage) -> Result<String>;

    /// Check if the analyzer can be called (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }

    /// True when the backend requires a key and none is configured
    fn missing_api_key(&self) -> bool {
        self.info().requires_api_key && !self.is_available()
    }
}
