//! # Slack
//!
//! Everything that talks to Slack:
//!
//! - [`api`]: Web API client with retry on rate limits and server errors
//! - [`stream`]: [`ChatStream`](crate::stream::ChatStream) backed by Slack's streaming messages
//! - [`events`]: Socket Mode envelopes and the events the assistant handles
//! - [`handlers`]: per-event behaviour
//! - [`socket`]: the Socket Mode connection loop

pub mod api;
pub mod blocks;
pub mod events;
pub mod handlers;
pub mod socket;
pub mod stream;

pub use api::{SlackApiClient, SuggestedPrompt};
pub use events::{SlackEvent, SocketEnvelope};
pub use handlers::EventHandlers;
pub use socket::SocketModeRunner;
pub use stream::{SlackChatStream, StreamTarget, TaskDisplayMode};
