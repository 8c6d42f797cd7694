use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{AnalyzerInfo, ImageAnalyzer, InlineImage};
use super::{request_error, retry_after};
use crate::error::{Error, Result};

/// Finish reasons for which Gemini withholds the answer.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

/// Google Gemini analyzer speaking the `generateContent` REST protocol.
pub struct GeminiAnalyzer {
    client: Client,
    /// Base URL for the API (e.g., "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,
    pub api_key: Option<String>,
    /// Model identifier, with or without the `models/` prefix
    pub model: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: Blob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiAnalyzer {
    pub const fn new(
        client: Client,
        api_base: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            api_base,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/models/{model}:generateContent",
            self.api_base.trim_end_matches('/')
        )
    }

    fn build_request<'a>(prompt: &'a str, image: &'a InlineImage) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::Inline {
                        inline_data: Blob {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        }
    }
}

/// Pull the answer out of a `generateContent` response.
///
/// Text parts of the first candidate are concatenated in order.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::AnalyzerBlocked(reason));
        }
        return Err(Error::AnalyzerInvalidResponse(
            "No candidates in response".to_string(),
        ));
    };

    if let Some(reason) = candidate.finish_reason.as_deref()
        && BLOCKING_FINISH_REASONS.contains(&reason)
    {
        return Err(Error::AnalyzerBlocked(reason.to_string()));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::AnalyzerInvalidResponse(
            "Candidate contained no text".to_string(),
        ));
    }

    Ok(text)
}

/// Prefer Google's `error.message` over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl ImageAnalyzer for GeminiAnalyzer {
    fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo {
            name: "Gemini",
            requires_api_key: true,
        }
    }

    async fn describe(&self, prompt: &str, image: &InlineImage) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(Error::AnalyzerMissingApiKey)?;

        let url = self.endpoint();
        debug!(
            "Gemini request to {} ({}, {} base64 chars)",
            url,
            image.mime_type,
            image.data.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(prompt, image))
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(&response);
            warn!("Rate limited, retry after {:?}s", retry_after);
            return Err(Error::AnalyzerRateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!("Gemini API error: {} - {}", status, message);
            return Err(Error::AnalyzerRequest(format!("HTTP {status}: {message}")));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| Error::AnalyzerInvalidResponse(e.to_string()))?;

        extract_text(parsed)
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}
