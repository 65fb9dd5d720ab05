//! # LLM Providers
//!
//! Two provider seams and the adapters that drive them:
//!
//! - [`PrimaryProvider`] streams typed [`ResponseEvent`]s and may request tool
//!   calls. [`PrimaryAdapter`] relays them to a [`crate::stream::ChatStream`].
//! - [`CompletionProvider`] answers a chat completion in one shot.
//!   [`SecondaryAdapter`] wraps it with the dice short-circuit and canned replies.
//!
//! The HTTP implementations are [`OpenAiClient`] and [`HuggingFaceClient`].

pub mod canned;
pub mod events;
pub mod huggingface;
pub mod openai;
pub mod primary;
pub mod secondary;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::history::PromptHistory;
use crate::tools::ToolDefinition;

pub use events::{ResponseEvent, ToolCall};
pub use huggingface::HuggingFaceClient;
pub use openai::OpenAiClient;
pub use primary::PrimaryAdapter;
pub use secondary::{SecondaryAdapter, SecondaryReply};

type BoxedEventStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent, ProviderError>> + Send>>;

/// Streaming response wrapper
///
/// Wraps an async stream of decoded provider events.
pub struct ResponseEventStream {
    inner: BoxedEventStream,
}

impl ResponseEventStream {
    /// Create a new stream from any compatible async stream
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<ResponseEvent, ProviderError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Stream that yields a fixed sequence of results, then ends.
    pub fn from_events(events: Vec<Result<ResponseEvent, ProviderError>>) -> Self {
        Self::new(futures::stream::iter(events))
    }

    pub fn into_inner(self) -> BoxedEventStream {
        self.inner
    }
}

/// A chat message for completion-style endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Streaming provider with tool calling.
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    /// Start one streamed response for `history`, advertising `tools`.
    ///
    /// Errors before the first event (transport, non-success status) are
    /// returned here; later failures arrive as stream items.
    async fn stream_response(
        &self,
        history: &PromptHistory,
        tools: &[ToolDefinition],
    ) -> Result<ResponseEventStream, ProviderError>;

    /// Provider name for logging/debugging
    fn name(&self) -> &str;
}

/// Non-streaming chat completion provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Text of the first choice, or `None` when the response carries none.
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, ProviderError>;

    /// Provider name for logging/debugging
    fn name(&self) -> &str;
}
