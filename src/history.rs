//! # Prompt History
//!
//! The conversation handed to the model, in order. Serializes directly into the
//! `input` array of the Responses API, so tool-call and tool-result turns
//! appended during a run are replayed verbatim on the follow-up request.

use serde::{Deserialize, Serialize};

/// Speaker of a plain message turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the prompt history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        /// Raw JSON arguments exactly as the model produced them.
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only conversation owned by one `call_llm` invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PromptHistory {
    turns: Vec<Turn>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History holding a single user message, the shape every Slack event starts with.
    pub fn from_user_message(text: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::user(text)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Index and content of the most recent non-empty user message.
    fn last_user_message(&self) -> Option<(usize, &str)> {
        self.turns
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, turn)| match turn {
                Turn::Message {
                    role: Role::User,
                    content,
                } if !content.is_empty() => Some((index, content.as_str())),
                _ => None,
            })
    }

    /// Split the history into the prompt for a plain chat model and the
    /// `User: ...` / `Assistant: ...` transcript of everything before it.
    ///
    /// Tool turns carry no text for a chat-completion model and are skipped.
    pub fn split_for_chat(&self) -> (Option<&str>, Vec<String>) {
        let (cutoff, prompt) = match self.last_user_message() {
            Some((index, content)) => (index, Some(content)),
            None => (self.turns.len(), None),
        };

        let transcript = self.turns[..cutoff]
            .iter()
            .filter_map(|turn| match turn {
                Turn::Message {
                    role: Role::User,
                    content,
                } if !content.is_empty() => Some(format!("User: {content}")),
                Turn::Message {
                    role: Role::Assistant,
                    content,
                } if !content.is_empty() => Some(format!("Assistant: {content}")),
                _ => None,
            })
            .collect();

        (prompt, transcript)
    }
}
