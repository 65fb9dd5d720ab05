//! # Output Streams
//!
//! A [`ChatStream`] is the open, append-only channel a reply is written to.
//! Text and status chunks are delivered in the order they are appended, and the
//! channel accepts exactly one `stop`; anything after that is an error.
//!
//! Implementations:
//! - [`crate::slack::SlackChatStream`] - a Slack thread, via `chat.*Stream`
//! - [`ConsoleStream`] - stdout, used by the `ask` command
//! - [`RecordingStream`] - in-memory, used by tests

use std::io::Write;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StreamError;

// =============================================================================
// CHUNKS
// =============================================================================

/// Lifecycle of a task shown in the thread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Error => "error",
        }
    }
}

/// A structured piece of streamed content, serialized in Slack's chunk format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    MarkdownText {
        text: String,
    },
    TaskUpdate {
        id: String,
        title: String,
        status: TaskStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    PlanUpdate {
        title: String,
    },
}

impl Chunk {
    pub fn markdown(text: impl Into<String>) -> Self {
        Chunk::MarkdownText { text: text.into() }
    }

    pub fn task(id: impl Into<String>, title: impl Into<String>, status: TaskStatus) -> Self {
        Chunk::TaskUpdate {
            id: id.into(),
            title: title.into(),
            status,
            details: None,
            output: None,
        }
    }

    pub fn plan(title: impl Into<String>) -> Self {
        Chunk::PlanUpdate {
            title: title.into(),
        }
    }

    /// Attach details to a task update. No-op for other chunk kinds.
    pub fn with_details(mut self, text: impl Into<String>) -> Self {
        if let Chunk::TaskUpdate { details, .. } = &mut self {
            *details = Some(text.into());
        }
        self
    }

    /// Attach output to a task update. No-op for other chunk kinds.
    pub fn with_output(mut self, text: impl Into<String>) -> Self {
        if let Chunk::TaskUpdate { output, .. } = &mut self {
            *output = Some(text.into());
        }
        self
    }
}

// =============================================================================
// STREAM TRAIT
// =============================================================================

/// An open output channel bound to one conversation thread.
#[async_trait]
pub trait ChatStream: Send {
    /// Append a markdown text delta.
    async fn append_text(&mut self, text: &str) -> Result<(), StreamError>;

    /// Append structured chunks (task and plan updates).
    async fn append_chunks(&mut self, chunks: Vec<Chunk>) -> Result<(), StreamError>;

    /// Close the stream. Valid once.
    async fn stop(&mut self, chunks: Vec<Chunk>, blocks: Option<Value>)
        -> Result<(), StreamError>;
}

// =============================================================================
// CONSOLE STREAM
// =============================================================================

/// Writes text to stdout as it arrives and task updates as bracketed lines.
#[derive(Debug, Default)]
pub struct ConsoleStream {
    stopped: bool,
}

impl ConsoleStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_chunks(chunks: &[Chunk]) {
        for chunk in chunks {
            match chunk {
                Chunk::MarkdownText { text } => print!("{text}"),
                Chunk::TaskUpdate { title, status, .. } => {
                    println!("\n[{}] {}", status.as_str(), title)
                }
                Chunk::PlanUpdate { title } => println!("\n== {title} =="),
            }
        }
    }
}

#[async_trait]
impl ChatStream for ConsoleStream {
    async fn append_text(&mut self, text: &str) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        print!("{text}");
        std::io::stdout()
            .flush()
            .map_err(|e| StreamError::Transport(e.to_string()))
    }

    async fn append_chunks(&mut self, chunks: Vec<Chunk>) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        Self::print_chunks(&chunks);
        Ok(())
    }

    async fn stop(
        &mut self,
        chunks: Vec<Chunk>,
        _blocks: Option<Value>,
    ) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        self.stopped = true;
        Self::print_chunks(&chunks);
        println!();
        Ok(())
    }
}

// =============================================================================
// RECORDING STREAM
// =============================================================================

/// Everything a [`RecordingStream`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Chunks(Vec<Chunk>),
    Stop {
        chunks: Vec<Chunk>,
        blocks: Option<Value>,
    },
}

impl StreamEvent {
    /// Chunks carried by this event; empty for text.
    pub fn chunks(&self) -> &[Chunk] {
        match self {
            StreamEvent::Chunks(chunks) => chunks,
            StreamEvent::Stop { chunks, .. } => chunks,
            StreamEvent::Text(_) => &[],
        }
    }
}

/// In-memory stream that records calls. Optionally fails one append.
#[derive(Debug, Default)]
pub struct RecordingStream {
    events: Vec<StreamEvent>,
    appends: usize,
    fail_append_at: Option<usize>,
    stopped: bool,
}

impl RecordingStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th append call (1-based) with a transport error; later appends succeed.
    pub fn failing_append(n: usize) -> Self {
        Self {
            fail_append_at: Some(n),
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// All appended text deltas, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Appended text concatenated.
    pub fn text(&self) -> String {
        self.texts().concat()
    }

    /// All task updates as `(id, title, status)`, in order.
    pub fn task_updates(&self) -> Vec<(String, String, TaskStatus)> {
        self.events
            .iter()
            .flat_map(StreamEvent::chunks)
            .filter_map(|chunk| match chunk {
                Chunk::TaskUpdate {
                    id, title, status, ..
                } => Some((id.clone(), title.clone(), *status)),
                _ => None,
            })
            .collect()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn check_append(&mut self) -> Result<(), StreamError> {
        if self.stopped {
            return Err(StreamError::AlreadyStopped);
        }
        self.appends += 1;
        if self.fail_append_at == Some(self.appends) {
            return Err(StreamError::Transport("injected append failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStream for RecordingStream {
    async fn append_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.check_append()?;
        self.events.push(StreamEvent::Text(text.to_string()));
        Ok(())
    }

    async fn append_chunks(&mut self, chunks: Vec<Chunk>) -> Result<(), StreamError> {
        self.check_append()?;
        self.events.push(StreamEvent::Chunks(chunks));
        Ok(())
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
        self.events.push(StreamEvent::Stop { chunks, blocks });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_chunk_serialization() {
        let chunk = Chunk::task("call_1", "Rolling a 3d20...", TaskStatus::InProgress);
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            json!({
                "type": "task_update",
                "id": "call_1",
                "title": "Rolling a 3d20...",
                "status": "in_progress"
            })
        );
    }

    #[test]
    fn test_details_only_apply_to_tasks() {
        let plan = Chunk::plan("Adding finishing touches").with_details("ignored");
        assert_eq!(plan, Chunk::plan("Adding finishing touches"));

        let task = Chunk::task("001", "Understanding", TaskStatus::Complete)
            .with_details("- goals")
            .with_output("done");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["details"], "- goals");
        assert_eq!(value["output"], "done");
    }

    #[tokio::test]
    async fn test_recording_stream_rejects_use_after_stop() {
        let mut stream = RecordingStream::new();
        stream.append_text("hello").await.unwrap();
        stream.stop(vec![], None).await.unwrap();

        assert!(matches!(
            stream.append_text("late").await,
            Err(StreamError::AlreadyStopped)
        ));
        assert!(matches!(
            stream.stop(vec![], None).await,
            Err(StreamError::AlreadyStopped)
        ));
        assert_eq!(stream.texts(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_recording_stream_injected_failure_is_one_shot() {
        let mut stream = RecordingStream::failing_append(2);
        stream.append_text("a").await.unwrap();
        assert!(stream.append_text("b").await.is_err());
        stream.append_text("c").await.unwrap();
        assert_eq!(stream.text(), "ac");
    }
}
