//! # Orchestrator
//!
//! Top-level `call_llm`: stream from the primary provider, fall back to the
//! secondary one on any failure, and always leave something readable in the
//! thread. Errors never escape; the caller only has to `stop` the stream.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ProviderError;
use crate::format::format_for_slack;
use crate::history::PromptHistory;
use crate::llm::secondary::{dice_reply, SYSTEM_PROMPT};
use crate::llm::{
    HuggingFaceClient, OpenAiClient, PrimaryAdapter, SecondaryAdapter, SecondaryReply,
};
use crate::stream::ChatStream;

// =============================================================================
// USER-VISIBLE MESSAGES
// =============================================================================
pub const FALLBACK_NOTICE: &str = "🤖 Using Hugging Face AI...\n\n";

pub const UNAVAILABLE_MESSAGE: &str =
    "❌ Sorry, all AI services are currently unavailable. Please try again later.";

pub const EMPTY_REPLY_MESSAGE: &str = "🤖 Sorry, something went wrong on my side and I couldn't \
                                       come up with an answer. If your question is about \
                                       programming, please try again.";

/// Prompt used when the history holds no user message.
pub const DEFAULT_PROMPT: &str = "Hello! How can I help you today?";

// =============================================================================
// ORCHESTRATOR
// =============================================================================
/// Chooses a provider per request. Shared read-only across event tasks.
pub struct Orchestrator {
    primary: Option<PrimaryAdapter>,
    secondary: Option<SecondaryAdapter>,
}

impl Orchestrator {
    pub fn new(primary: Option<PrimaryAdapter>, secondary: Option<SecondaryAdapter>) -> Self {
        Self { primary, secondary }
    }

    /// Build the primary adapter when an OpenAI key is set, and the fallback
    /// adapter always.
    pub fn from_config(config: &Config) -> Result<Self> {
        let primary = match config.openai_api_key.as_deref() {
            Some(key) => {
                let client = OpenAiClient::new(key, &config.openai_model)?
                    .with_api_base(&config.openai_api_base)
                    .with_request_timeout(config.request_timeout());
                Some(
                    PrimaryAdapter::new(Arc::new(client))
                        .with_max_tool_rounds(config.max_tool_rounds)
                        .with_idle_timeout(config.stream_idle_timeout()),
                )
            }
            None => None,
        };

        // An empty key surfaces as MissingCredential inside the client.
        let huggingface_key = config.huggingface_api_key.clone().unwrap_or_default();
        let client = HuggingFaceClient::new(huggingface_key, &config.huggingface_model)
            .with_api_base(&config.huggingface_api_base)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
            .with_request_timeout(config.request_timeout());
        let secondary = Some(SecondaryAdapter::new(Arc::new(client)));

        info!(
            primary = primary.is_some(),
            huggingface_key = config.huggingface_api_key.is_some(),
            "Providers configured"
        );

        Ok(Self::new(primary, secondary))
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Write a reply for `history` to `stream`.
    ///
    /// Tool turns produced by the primary provider are appended to `history`.
    pub async fn call_llm(&self, stream: &mut dyn ChatStream, history: &mut PromptHistory) {
        match &self.primary {
            Some(primary) => {
                info!(provider = primary.provider_name(), "Trying primary provider");
                match primary.run(stream, history).await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(error = %e, "Primary provider failed, falling back");
                    }
                }
            }
            None => info!("No primary provider configured, using fallback directly"),
        }

        if let Err(e) = self.call_secondary(stream, history).await {
            error!(error = %e, "Fallback provider failed");
            if let Err(e) = stream.append_text(UNAVAILABLE_MESSAGE).await {
                error!(error = %e, "Could not write unavailability message");
            }
        }
    }

    async fn call_secondary(
        &self,
        stream: &mut dyn ChatStream,
        history: &PromptHistory,
    ) -> Result<(), ProviderError> {
        stream.append_text(FALLBACK_NOTICE).await?;

        let (prompt, transcript) = history.split_for_chat();
        let prompt = prompt.unwrap_or(DEFAULT_PROMPT);

        let reply = match &self.secondary {
            Some(secondary) => {
                info!(provider = secondary.provider_name(), "Using fallback provider");
                secondary.complete(SYSTEM_PROMPT, prompt, &transcript).await
            }
            None => match dice_reply(prompt) {
                Some(text) => SecondaryReply::Dice(text),
                None => return Err(ProviderError::MissingCredential),
            },
        };

        let text = match reply {
            SecondaryReply::Completion(text) => format_for_slack(&text),
            SecondaryReply::Dice(text) | SecondaryReply::Canned(text) => text,
            SecondaryReply::Empty => EMPTY_REPLY_MESSAGE.to_string(),
        };

        stream.append_text(&text).await?;
        Ok(())
    }
}
