//! OpenAI Responses API client (streaming, with tools).

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::events::parse_event;
use super::{PrimaryProvider, ResponseEventStream};
use crate::error::ProviderError;
use crate::history::PromptHistory;
use crate::tools::ToolDefinition;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a PromptHistory,
    tools: Vec<FunctionTool<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for FunctionTool<'a> {
    fn from(def: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            name: &def.name,
            description: &def.description,
            parameters: &def.parameters,
        }
    }
}

/// Streams responses from `POST {api_base}/responses`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    request_timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredential);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(60),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound on waiting for the response headers. The body is bounded per event
    /// by the adapter's idle timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.api_base)
    }
}

#[async_trait]
impl PrimaryProvider for OpenAiClient {
    async fn stream_response(
        &self,
        history: &PromptHistory,
        tools: &[ToolDefinition],
    ) -> Result<ResponseEventStream, ProviderError> {
        let body = ResponsesRequest {
            model: &self.model,
            input: history,
            tools: tools.iter().map(FunctionTool::from).collect(),
            stream: true,
        };

        info!(model = %self.model, turns = history.len(), "Requesting streamed response");

        let send = self
            .client
            .post(self.responses_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.request_timeout, send)
            .await
            .map_err(|_| ProviderError::Timeout(self.request_timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|frame| async move {
                match frame {
                    Ok(event) if event.data == "[DONE]" => None,
                    Ok(event) => {
                        debug!(event = %event.event, "Stream event");
                        Some(parse_event(&event.data))
                    }
                    Err(e) => Some(Err(ProviderError::InvalidResponse(format!(
                        "SSE stream error: {e}"
                    )))),
                }
            });

        Ok(ResponseEventStream::new(events))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseEvent;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(events: &[Value]) -> String {
        events
            .iter()
            .map(|event| format!("event: {}\ndata: {}\n\n", event["type"].as_str().unwrap(), event))
            .collect()
    }

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(matches!(
            OpenAiClient::new("  ", DEFAULT_MODEL),
            Err(ProviderError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_streams_decoded_events() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            serde_json::json!({"type": "response.created", "response": {"id": "resp_1"}}),
            serde_json::json!({"type": "response.output_text.delta", "delta": "Hi"}),
            serde_json::json!({"type": "response.output_text.delta", "delta": " there"}),
        ]);

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "stream": true,
                "input": [{"type": "message", "role": "user", "content": "hello"}],
                "tools": [{"type": "function", "name": "roll_dice"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", DEFAULT_MODEL)
            .unwrap()
            .with_api_base(server.uri());
        let history = PromptHistory::from_user_message("hello");
        let events: Vec<_> = client
            .stream_response(&history, &crate::tools::definitions())
            .await
            .unwrap()
            .into_inner()
            .collect()
            .await;

        let events: Vec<ResponseEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                ResponseEvent::Other,
                ResponseEvent::TextDelta {
                    delta: "Hi".to_string()
                },
                ResponseEvent::TextDelta {
                    delta: " there".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-bad", DEFAULT_MODEL)
            .unwrap()
            .with_api_base(server.uri());
        let result = client
            .stream_response(&PromptHistory::from_user_message("hi"), &[])
            .await;

        match result {
            Err(ProviderError::HttpStatus { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
