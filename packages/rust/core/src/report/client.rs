//! OpenRouter chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use socialsync_shared::{AppConfig, Result, SocialSyncError, openrouter_api_key};
use tracing::debug;

use super::{ReportGenerator, ReportRequest};

/// Reasoning models can take minutes per report.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
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

pub struct OpenRouterClient {
    api_key: String,
    api_base: String,
    http: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SocialSyncError::Report(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Build a client from `[openrouter]` config, reading the key from its env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = openrouter_api_key(config)?;
        Self::new(api_key, config.openrouter.api_base.clone())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| SocialSyncError::config(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("X-Title", HeaderValue::from_static("SocialSync"));
        Ok(headers)
    }
}

#[async_trait]
impl ReportGenerator for OpenRouterClient {
    async fn generate(&self, request: &ReportRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %request.model, "OpenRouter chat request");

        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| SocialSyncError::Report(format!("OpenRouter request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SocialSyncError::Report(format!(
                "OpenRouter API error ({status}): {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SocialSyncError::Report(format!("invalid OpenRouter response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SocialSyncError::Report("No response from OpenRouter".into()))
    }
}
