//! Error types for the provider and stream layers.
//!
//! Application code (bootstrap, the Slack Web API client) uses `anyhow`;
//! the pieces the orchestrator has to reason about use the typed enums here.

use std::time::Duration;

use thiserror::Error;

/// Failures raised by an output stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream already stopped")]
    AlreadyStopped,

    #[error("stream transport error: {0}")]
    Transport(String),
}

/// Failures raised by a model provider or the adapters that drive it.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No credential configured. A routing signal, not a fault.
    #[error("provider credential is not configured")]
    MissingCredential,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("provider reported an error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no provider event within {0:?}")]
    Timeout(Duration),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}
