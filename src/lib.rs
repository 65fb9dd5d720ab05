//! # Slack Code Assistant
//!
//! A Slack bot that streams answers from a language model into assistant
//! threads. Replies come from a streaming provider with tool calling
//! (dice rolls) and fall back to a one-shot chat completion provider, with
//! canned answers as the last resort.
//!
//! ## Module Structure
//!
//! - [`config`]: environment-driven configuration
//! - [`error`]: typed provider and stream errors
//! - [`history`]: the prompt history sent to providers
//! - [`stream`]: the output channel abstraction and its chunks
//! - [`tools`]: tools the model may call
//! - [`format`]: Slack-friendly formatting of fallback replies
//! - [`llm`]: provider clients and adapters
//! - [`orchestrator`]: primary/fallback routing
//! - [`slack`]: Web API client, Socket Mode intake and event handlers

pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod slack;
pub mod stream;
pub mod tools;

pub use config::Config;
pub use error::{ProviderError, StreamError};
pub use history::{PromptHistory, Turn};
pub use orchestrator::Orchestrator;
pub use stream::{ChatStream, Chunk, TaskStatus};
