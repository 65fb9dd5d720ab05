//! [`ChatStream`] backed by Slack's `chat.startStream` / `chat.appendStream` /
//! `chat.stopStream`.
//!
//! Text is buffered and sent once the buffer reaches `buffer_size` bytes.
//! Pending text is always flushed ahead of chunks and on stop, so the thread
//! shows everything in append order. The Slack message itself is created
//! lazily by the first flush.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::api::SlackApiClient;
use crate::error::StreamError;
use crate::stream::{ChatStream, Chunk};

pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// How Slack groups task updates in the streamed message.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskDisplayMode {
    Plan,
    Timeline,
}

/// Where a stream is posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub channel: String,
    pub thread_ts: String,
    pub recipient_team_id: Option<String>,
    pub recipient_user_id: Option<String>,
    pub task_display_mode: Option<TaskDisplayMode>,
}

impl StreamTarget {
    pub fn new(channel: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: thread_ts.into(),
            recipient_team_id: None,
            recipient_user_id: None,
            task_display_mode: None,
        }
    }

    pub fn with_recipient(mut self, team_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.recipient_team_id = Some(team_id.into());
        self.recipient_user_id = Some(user_id.into());
        self
    }

    pub fn with_task_display_mode(mut self, mode: TaskDisplayMode) -> Self {
        self.task_display_mode = Some(mode);
        self
    }
}

pub struct SlackChatStream {
    client: Arc<SlackApiClient>,
    target: StreamTarget,
    ts: Option<String>,
    buffer: String,
    buffer_size: usize,
    stopped: bool,
}

impl SlackChatStream {
    pub fn new(client: Arc<SlackApiClient>, target: StreamTarget) -> Self {
        Self {
            client,
            target,
            ts: None,
            buffer: String::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            stopped: false,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// `ts` of the streamed message, once it exists.
    pub fn ts(&self) -> Option<&str> {
        self.ts.as_deref()
    }

    /// Pending text as a markdown chunk, followed by `chunks`.
    fn drain_with(&mut self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut out = Vec::with_capacity(chunks.len() + 1);
        if !self.buffer.is_empty() {
            out.push(Chunk::markdown(std::mem::take(&mut self.buffer)));
        }
        out.extend(chunks);
        out
    }

    async fn send(&mut self, chunks: Vec<Chunk>) -> Result<(), StreamError> {
        let chunks = self.drain_with(chunks);
        if chunks.is_empty() {
            return Ok(());
        }

        match &self.ts {
            Some(ts) => self
                .client
                .append_stream(&self.target.channel, ts, &chunks)
                .await
                .map_err(transport)?,
            None => {
                let ts = self
                    .client
                    .start_stream(&self.target, &chunks)
                    .await
                    .map_err(transport)?;
                debug!(channel = %self.target.channel, ts = %ts, "Started Slack stream");
                self.ts = Some(ts);
            }
        }
        Ok(())
    }
}

fn transport(error: anyhow::Error) -> StreamError {
    StreamError::Transport(format!("{error:#}"))
}

#[async_trait]
impl ChatStream for SlackChatStream {
    async fn append_text(&mut self, text: &str) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        self.buffer.push_str(text);
        if self.buffer.len() >= self.buffer_size {
            self.send(Vec::new()).await?;
        }
        Ok(())
    }

    async fn append_chunks(&mut self, chunks: Vec<Chunk>) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        self.send(chunks).await
    }

    async fn stop(
        &mut self,
        chunks: Vec<Chunk>,
        blocks: Option<Value>,
    ) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        self.stopped = true;

        let chunks = self.drain_with(chunks);
        let ts = match self.ts.take() {
            Some(ts) => ts,
            None => self
                .client
                .start_stream(&self.target, &[])
                .await
                .map_err(transport)?,
        };

        self.client
            .stop_stream(&self.target.channel, &ts, &chunks, blocks.as_ref())
            .await
            .map_err(transport)?;
        self.ts = Some(ts);
        Ok(())
    }
}
