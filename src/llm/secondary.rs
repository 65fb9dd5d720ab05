//! # Secondary Adapter
//!
//! One-shot fallback path. Dice requests are answered locally, everything
//! else goes to a [`CompletionProvider`]; when that call fails the reply comes
//! from the [`canned`](super::canned) table. [`SecondaryAdapter::complete`]
//! never returns an error.

use std::sync::Arc;

use tracing::{info, warn};

use super::canned::canned_reply;
use super::{ChatMessage, CompletionProvider};
use crate::error::ProviderError;
use crate::tools::dice;

/// System prompt for the completion model.
pub const SYSTEM_PROMPT: &str = "You're an AI assistant specialized in answering questions about code.
You'll analyze code-related questions and provide clear, accurate responses.
When you include markdown text, convert them to Slack compatible ones.
When you include code examples, convert them to Slack compatible ones. (There must be an empty line before a code block.)
When a prompt has Slack's special syntax like <@USER_ID> or <#CHANNEL_ID>, you must keep them as-is in your response.";

const DICE_INTENT: [&str; 3] = ["roll", "dice", "random"];

/// What the secondary path produced, so the caller can decide how to present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryReply {
    /// Local dice results, already formatted.
    Dice(String),
    /// Raw model output.
    Completion(String),
    /// Fixed reply chosen after the remote call failed.
    Canned(String),
    /// Nothing usable: no credential or an empty response.
    Empty,
}

pub struct SecondaryAdapter {
    provider: Arc<dyn CompletionProvider>,
}

impl SecondaryAdapter {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer `user_message` given the prior `history` lines.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        history: &[String],
    ) -> SecondaryReply {
        if let Some(reply) = dice_reply(user_message) {
            info!("Answering dice request locally");
            return SecondaryReply::Dice(reply);
        }

        let messages = [
            ChatMessage::system(with_context(system_prompt, history)),
            ChatMessage::user(user_message),
        ];

        match self.provider.chat_completion(&messages).await {
            Ok(Some(text)) if !text.is_empty() => SecondaryReply::Completion(text),
            Ok(_) => {
                warn!(provider = self.provider.name(), "Empty completion");
                SecondaryReply::Empty
            }
            Err(ProviderError::MissingCredential) => {
                warn!(provider = self.provider.name(), "No credential configured");
                SecondaryReply::Empty
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Completion failed, using canned reply");
                SecondaryReply::Canned(canned_reply(user_message))
            }
        }
    }
}

/// Roll the dice named in `message` when it asks for a roll.
pub fn dice_reply(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    if !DICE_INTENT.iter().any(|word| lower.contains(word)) {
        return None;
    }
    let outcomes = dice::roll_from_text(&lower, &mut rand::thread_rng())?;
    Some(format!(
        "🎲 {}\n\nAnything else I can help you with?",
        dice::describe_all(&outcomes)
    ))
}

fn with_context(system_prompt: &str, history: &[String]) -> String {
    if history.is_empty() {
        system_prompt.to_string()
    } else {
        format!(
            "{system_prompt}\n\nConversation so far:\n{}",
            history.join("\n")
        )
    }
}
