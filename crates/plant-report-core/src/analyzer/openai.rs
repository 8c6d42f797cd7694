use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{AnalyzerInfo, ImageAnalyzer, InlineImage};
use super::{request_error, retry_after};
use crate::error::{Error, Result};

/// OpenAI-compatible vision analyzer
/// Works with: OpenAI, llama.cpp server, Ollama, vLLM, OpenRouter, etc.
pub struct OpenAiAnalyzer {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiAnalyzer {
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

    fn build_request<'a>(&'a self, prompt: &'a str, image: &InlineImage) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_uri(),
                        },
                    },
                ],
            }],
        }
    }
}

fn extract_text(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::AnalyzerInvalidResponse("No choices in response".to_string()))?;

    let content = content.trim();
    if content.is_empty() {
        return Err(Error::AnalyzerInvalidResponse(
            "Empty completion".to_string(),
        ));
    }
    Ok(content.to_string())
}

#[async_trait]
impl ImageAnalyzer for OpenAiAnalyzer {
    fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
        }
    }

    async fn describe(&self, prompt: &str, image: &InlineImage) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        debug!("Vision request to {} with model {}", url, self.model);

        let mut req = self.client.post(&url).json(&self.build_request(prompt, image));

        // Add API key if configured
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| request_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(&response);
            warn!("Rate limited, retry after {:?}s", retry_after);
            return Err(Error::AnalyzerRateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("API error: {} - {}", status, body);
            return Err(Error::AnalyzerRequest(format!("HTTP {status}: {body}")));
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::AnalyzerInvalidResponse(e.to_string()))?;

        extract_text(parsed)
    }
}
