//! Hugging Face router chat completions (OpenAI-compatible, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{ChatMessage, CompletionProvider};
use crate::error::ProviderError;

pub const DEFAULT_API_BASE: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-Coder-32B-Instruct";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
}

impl HuggingFaceClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// `choices[0].message.content`, or `choices[0].content` from providers that
/// flatten the message. Non-string content counts as missing.
pub fn first_choice_content(body: &Value) -> Option<&str> {
    let choice = body.get("choices")?.get(0)?;
    choice
        .pointer("/message/content")
        .or_else(|| choice.get("content"))
        .and_then(Value::as_str)
}

#[async_trait]
impl CompletionProvider for HuggingFaceClient {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredential);
        }

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        info!(model = %self.model, "Requesting chat completion");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.request_timeout)
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        let content = first_choice_content(&value).map(|text| text.trim().to_string());
        if content.is_none() {
            warn!("Chat completion carried no text content");
        }
        Ok(content)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
