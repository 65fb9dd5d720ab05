//! # Primary Adapter
//!
//! Drives a [`PrimaryProvider`] stream into a [`ChatStream`]:
//!
//! ```text
//! STREAMING ──(stream ends, no calls)──▶ DONE
//!     │
//!     ├──(stream ends, calls)──▶ TOOL_PENDING ──(resolve, follow-up pass)──▶ STREAMING
//!     │
//!     └──(transport/API error, idle timeout)──▶ FAILED
//! ```
//!
//! Follow-up passes are bounded by `max_tool_rounds`. The adapter never stops
//! the output stream; that belongs to whoever opened it.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::events::{failure_message, ResponseEvent, ToolCall};
use super::PrimaryProvider;
use crate::error::ProviderError;
use crate::history::{PromptHistory, Turn};
use crate::stream::{ChatStream, Chunk, TaskStatus};
use crate::tools::{self, ToolDefinition, ToolOutcome};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Task id of the chunk emitted when the tool round bound is hit.
pub const TOOL_ROUNDS_TASK_ID: &str = "tool-rounds";

/// How one streamed pass ended.
#[derive(Debug)]
enum PassOutcome {
    Done,
    ToolPending(Vec<ToolCall>),
}

pub struct PrimaryAdapter {
    provider: Arc<dyn PrimaryProvider>,
    tools: Vec<ToolDefinition>,
    max_tool_rounds: usize,
    idle_timeout: Duration,
}

impl PrimaryAdapter {
    pub fn new(provider: Arc<dyn PrimaryProvider>) -> Self {
        Self {
            provider,
            tools: tools::definitions(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Stream the reply for `history`, executing tool calls and re-prompting
    /// until the model answers without one.
    ///
    /// Tool call and tool output turns are appended to `history` in place.
    pub async fn run(
        &self,
        stream: &mut dyn ChatStream,
        history: &mut PromptHistory,
    ) -> Result<(), ProviderError> {
        let mut rounds = 0;

        loop {
            let calls = match self.stream_pass(stream, history).await? {
                PassOutcome::Done => return Ok(()),
                PassOutcome::ToolPending(calls) => calls,
            };

            self.resolve_calls(stream, history, calls).await?;
            rounds += 1;

            if rounds >= self.max_tool_rounds {
                warn!(rounds, "Tool round limit reached, ending response");
                stream
                    .append_chunks(vec![Chunk::task(
                        TOOL_ROUNDS_TASK_ID,
                        format!("Stopped after {rounds} tool rounds"),
                        TaskStatus::Error,
                    )])
                    .await?;
                return Ok(());
            }

            debug!(rounds, turns = history.len(), "Requesting follow-up response");
        }
    }

    async fn stream_pass(
        &self,
        stream: &mut dyn ChatStream,
        history: &PromptHistory,
    ) -> Result<PassOutcome, ProviderError> {
        let mut events = self
            .provider
            .stream_response(history, &self.tools)
            .await?
            .into_inner();
        let mut calls = Vec::new();

        loop {
            let next = tokio::time::timeout(self.idle_timeout, events.next())
                .await
                .map_err(|_| ProviderError::Timeout(self.idle_timeout))?;
            let Some(event) = next else { break };

            match event? {
                ResponseEvent::TextDelta { delta } => {
                    if !delta.is_empty() {
                        stream.append_text(&delta).await?;
                    }
                }
                event @ ResponseEvent::ItemDone { .. } => {
                    let Some(call) = event.into_tool_call() else {
                        continue;
                    };
                    info!(tool = %call.name, call_id = %call.call_id, "Model requested tool call");
                    if let Some(title) = tools::pending_title(&call.name, &call.arguments) {
                        stream
                            .append_chunks(vec![Chunk::task(
                                call.call_id.clone(),
                                title,
                                TaskStatus::InProgress,
                            )])
                            .await?;
                    }
                    calls.push(call);
                }
                ResponseEvent::Error { message } => return Err(ProviderError::Api(message)),
                ResponseEvent::Failed { response } => {
                    return Err(ProviderError::Api(failure_message(&response)))
                }
                ResponseEvent::Other => {}
            }
        }

        if calls.is_empty() {
            Ok(PassOutcome::Done)
        } else {
            Ok(PassOutcome::ToolPending(calls))
        }
    }

    async fn resolve_calls(
        &self,
        stream: &mut dyn ChatStream,
        history: &mut PromptHistory,
        calls: Vec<ToolCall>,
    ) -> Result<(), ProviderError> {
        for call in calls {
            let outcome = {
                let mut rng = rand::thread_rng();
                tools::execute(&call.name, &call.arguments, &mut rng)
            };
            let call_id = call.call_id.clone();

            history.push(call.into());
            history.push(Turn::FunctionCallOutput {
                call_id: call_id.clone(),
                output: serde_json::to_string(outcome.output())?,
            });

            let chunk = match outcome {
                ToolOutcome::Complete { summary, .. } => {
                    Chunk::task(call_id, summary, TaskStatus::Complete)
                }
                ToolOutcome::Failed { error, .. } => {
                    warn!(call_id = %call_id, error = %error, "Tool call failed");
                    Chunk::task(call_id, error, TaskStatus::Error)
                }
            };
            stream.append_chunks(vec![chunk]).await?;
        }
        Ok(())
    }
}
