//! Primary provider stream events.
//!
//! Only the event kinds the adapter acts on get their own variant; every other
//! `type` deserializes to [`ResponseEvent::Other`] and is ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::history::Turn;

/// One Server-Sent Event from the Responses API, decoded from its `data` field.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ResponseEvent {
    #[serde(rename = "response.output_text.delta")]
    TextDelta {
        #[serde(default)]
        delta: String,
    },

    #[serde(rename = "response.output_item.done")]
    ItemDone { item: OutputItem },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: String,
    },

    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: Value,
    },

    #[serde(other)]
    Other,
}

/// A completed output item. Only function calls matter here.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    FunctionCall {
        #[serde(default)]
        id: String,
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },

    #[serde(other)]
    Other,
}

/// A function call the model finished emitting, waiting to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub call_id: String,
    pub name: String,
    /// Raw JSON, exactly as streamed.
    pub arguments: String,
}

impl From<ToolCall> for Turn {
    fn from(call: ToolCall) -> Self {
        Turn::FunctionCall {
            id: call.id,
            call_id: call.call_id,
            name: call.name,
            arguments: call.arguments,
        }
    }
}

impl ResponseEvent {
    /// The tool call carried by this event, if it completes one.
    pub fn into_tool_call(self) -> Option<ToolCall> {
        match self {
            ResponseEvent::ItemDone {
                item:
                    OutputItem::FunctionCall {
                        id,
                        call_id,
                        name,
                        arguments,
                    },
            } => Some(ToolCall {
                id,
                call_id,
                name,
                arguments,
            }),
            _ => None,
        }
    }
}

/// Decode the `data` payload of one SSE frame.
pub fn parse_event(data: &str) -> Result<ResponseEvent, ProviderError> {
    serde_json::from_str(data)
        .map_err(|e| ProviderError::InvalidResponse(format!("malformed stream event: {e}")))
}

/// Best-effort message out of a `response.failed` payload.
pub fn failure_message(response: &Value) -> String {
    response
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("response failed")
        .to_string()
}
