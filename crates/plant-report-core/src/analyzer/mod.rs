mod gemini;
mod openai;
mod traits;

pub use gemini::GeminiAnalyzer;
pub use openai::OpenAiAnalyzer;
pub use traits::{AnalyzerInfo, ImageAnalyzer, InlineImage};

use crate::config::{AnalyzerConfig, AnalyzerProvider};
use crate::error::{Error, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Create an analyzer from configuration
pub fn create_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn ImageAnalyzer>> {
    let client = build_client(config.timeout_secs)?;
    let api_base = config.resolved_api_base();

    let analyzer: Arc<dyn ImageAnalyzer> = match config.provider {
        AnalyzerProvider::Gemini => Arc::new(GeminiAnalyzer::new(
            client,
            api_base,
            config.api_key.clone(),
            config.model.clone(),
        )),
        AnalyzerProvider::OpenAi => Arc::new(OpenAiAnalyzer::new(
            client,
            api_base,
            config.api_key.clone(),
            config.model.clone(),
        )),
    };

    Ok(analyzer)
}

fn build_client(timeout_secs: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| Error::AnalyzerRequest(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport error onto the analyzer error taxonomy.
pub(crate) fn request_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::AnalyzerTimeout
    } else {
        Error::AnalyzerRequest(e.to_string())
    }
}

/// Read `retry-after` (seconds) from a 429 response.
pub(crate) fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
