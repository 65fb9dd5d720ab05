//! Slack Web API client.
//!
//! Every call goes through [`SlackApiClient::call`], which retries rate limits,
//! server errors and transport failures, then checks Slack's `ok` flag.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::stream::StreamTarget;
use crate::stream::Chunk;

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// A prompt button shown when an assistant thread opens.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SuggestedPrompt {
    pub title: String,
    pub message: String,
}

impl SuggestedPrompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy)]
enum Token {
    Bot,
    App,
}

#[derive(Debug, Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    app_token: Option<String>,
    retry_max_attempts: usize,
    retry_base_delay: Duration,
}

impl SlackApiClient {
    pub fn new(api_base: &str, bot_token: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            app_token: None,
            retry_max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
        })
    }

    /// App-level token, needed only for Socket Mode.
    pub fn with_app_token(mut self, app_token: &str) -> Self {
        self.app_token = Some(app_token.trim().to_string());
        self
    }

    pub fn with_retry(mut self, max_attempts: usize, base_delay: Duration) -> Self {
        self.retry_max_attempts = max_attempts.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    /// The bot's own user id.
    pub async fn auth_test(&self) -> Result<String> {
        let response = self.call("auth.test", Token::Bot, json!({})).await?;
        response
            .get("user_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    /// A fresh Socket Mode websocket URL.
    pub async fn open_socket_connection(&self) -> Result<String> {
        let response = self
            .call("apps.connections.open", Token::App, json!({}))
            .await?;
        response
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<()> {
        let mut payload = json!({ "channel": channel, "text": text });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = json!(thread_ts);
        }
        self.call("chat.postMessage", Token::Bot, payload).await?;
        Ok(())
    }

    pub async fn set_thread_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
        loading_messages: &[&str],
    ) -> Result<()> {
        let mut payload = json!({
            "channel_id": channel,
            "thread_ts": thread_ts,
            "status": status,
        });
        if !loading_messages.is_empty() {
            payload["loading_messages"] = json!(loading_messages);
        }
        self.call("assistant.threads.setStatus", Token::Bot, payload)
            .await?;
        Ok(())
    }

    pub async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<()> {
        let payload = json!({
            "channel_id": channel,
            "thread_ts": thread_ts,
            "prompts": prompts,
        });
        self.call("assistant.threads.setSuggestedPrompts", Token::Bot, payload)
            .await?;
        Ok(())
    }

    /// Open a streamed message and return its `ts`.
    pub async fn start_stream(&self, target: &StreamTarget, chunks: &[Chunk]) -> Result<String> {
        let mut payload = json!({
            "channel": target.channel,
            "thread_ts": target.thread_ts,
        });
        if let Some(team) = &target.recipient_team_id {
            payload["recipient_team_id"] = json!(team);
        }
        if let Some(user) = &target.recipient_user_id {
            payload["recipient_user_id"] = json!(user);
        }
        if let Some(mode) = target.task_display_mode {
            payload["task_display_mode"] = json!(mode);
        }
        if !chunks.is_empty() {
            payload["chunks"] = serde_json::to_value(chunks)?;
        }

        let response = self.call("chat.startStream", Token::Bot, payload).await?;
        response
            .get("ts")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("slack chat.startStream response missing ts"))
    }

    pub async fn append_stream(&self, channel: &str, ts: &str, chunks: &[Chunk]) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "ts": ts,
            "chunks": chunks,
        });
        self.call("chat.appendStream", Token::Bot, payload).await?;
        Ok(())
    }

    pub async fn stop_stream(
        &self,
        channel: &str,
        ts: &str,
        chunks: &[Chunk],
        blocks: Option<&Value>,
    ) -> Result<()> {
        let mut payload = json!({ "channel": channel, "ts": ts });
        if !chunks.is_empty() {
            payload["chunks"] = serde_json::to_value(chunks)?;
        }
        if let Some(blocks) = blocks {
            payload["blocks"] = blocks.clone();
        }
        self.call("chat.stopStream", Token::Bot, payload).await?;
        Ok(())
    }

    /// POST `payload` to `{api_base}/{method}` and return the decoded body.
    async fn call(&self, method: &str, token: Token, payload: Value) -> Result<Value> {
        let token = match token {
            Token::Bot => self.bot_token.as_str(),
            Token::App => self
                .app_token
                .as_deref()
                .ok_or_else(|| anyhow!("slack {method} needs an app-level token"))?,
        };
        let url = format!("{}/{}", self.api_base, method);

        let mut attempt = 0_usize;
        loop {
            attempt += 1;
            debug!(method, attempt, "Calling Slack API");
            let response = self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: Value = response
                            .json()
                            .await
                            .with_context(|| format!("failed to decode slack {method}"))?;
                        if body.get("ok").and_then(Value::as_bool) != Some(true) {
                            bail!(
                                "slack {method} failed: {}",
                                body.get("error")
                                    .and_then(Value::as_str)
                                    .unwrap_or("unknown error")
                            );
                        }
                        return Ok(body);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_status(status.as_u16())
                    {
                        warn!(method, status = status.as_u16(), attempt, "Retrying Slack API call");
                        tokio::time::sleep(retry_delay(self.retry_base_delay, attempt, retry_after))
                            .await;
                        continue;
                    }

                    bail!(
                        "slack api {method} failed with status {}: {}",
                        status.as_u16(),
                        body
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        warn!(method, attempt, error = %error, "Retrying Slack API call");
                        tokio::time::sleep(retry_delay(self.retry_base_delay, attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {method} request failed"));
                }
            }
        }
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn retry_delay(base: Duration, attempt: usize, retry_after_seconds: Option<u64>) -> Duration {
    if let Some(seconds) = retry_after_seconds {
        return Duration::from_secs(seconds);
    }
    let exponent = attempt.saturating_sub(1).min(6) as u32;
    base.saturating_mul(2_u32.pow(exponent))
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::stream::TaskDisplayMode;
    use crate::stream::TaskStatus;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SlackApiClient {
        SlackApiClient::new(&server.uri(), "xoxb-test", Duration::from_secs(5))
            .unwrap()
            .with_app_token("xapp-test")
            .with_retry(3, Duration::from_millis(1))
    }

    #[test]
    fn test_retry_delay_backoff() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(base, 1, None), Duration::from_millis(100));
        assert_eq!(retry_delay(base, 3, None), Duration::from_millis(400));
        assert_eq!(retry_delay(base, 2, Some(7)), Duration::from_secs(7));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
    }

    #[tokio::test]
    async fn test_open_socket_connection_uses_app_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apps.connections.open"))
            .and(header("authorization", "Bearer xapp-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "url": "wss://example.test/link"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server).open_socket_connection().await.unwrap();
        assert_eq!(url, "wss://example.test/link");
    }

    #[tokio::test]
    async fn test_not_ok_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message("C1", Some("1.0"), "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        client(&server)
            .post_message("C1", None, "hi")
            .await
            .unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_start_stream_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.startStream"))
            .and(body_json(json!({
                "channel": "D1",
                "thread_ts": "111.222",
                "recipient_team_id": "T1",
                "recipient_user_id": "U1",
                "task_display_mode": "timeline",
                "chunks": [
                    {"type": "task_update", "id": "call_1", "title": "Rolling a 1d6...", "status": "in_progress"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "333.444"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let target = StreamTarget::new("D1", "111.222")
            .with_recipient("T1", "U1")
            .with_task_display_mode(TaskDisplayMode::Timeline);
        let chunks = vec![Chunk::task("call_1", "Rolling a 1d6...", TaskStatus::InProgress)];
        let ts = client(&server).start_stream(&target, &chunks).await.unwrap();
        assert_eq!(ts, "333.444");
    }
}
