//! Socket Mode envelopes and the Events API payloads the bot reacts to.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// One frame from the Socket Mode websocket.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    /// Absent on `hello` and `disconnect`, which need no ack.
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl SocketEnvelope {
    pub fn is_disconnect(&self) -> bool {
        self.envelope_type == "disconnect"
    }
}

/// Decode a websocket frame. Control frames yield `None`.
pub fn parse_socket_message(message: WsMessage) -> Result<Option<SocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

/// Message-like event fields. Everything is optional here; handlers decide
/// what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

impl MessageEvent {
    /// Thread to answer in: the existing thread, or a new one under this message.
    pub fn reply_thread_ts(&self) -> Option<&str> {
        non_empty(self.thread_ts.as_deref()).or_else(|| non_empty(self.ts.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadStarted {
    pub channel: String,
    pub thread_ts: String,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention(MessageEvent),
    /// A user message inside an assistant (DM) thread.
    AssistantMessage(MessageEvent),
    AssistantThreadStarted(ThreadStarted),
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    #[serde(rename = "type")]
    callback_type: String,
    #[serde(default)]
    team_id: Option<String>,
    event: RawEvent,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    assistant_thread: Option<AssistantThread>,
    #[serde(flatten)]
    message: MessageEvent,
}

#[derive(Debug, Deserialize)]
struct AssistantThread {
    channel_id: String,
    thread_ts: String,
    #[serde(default)]
    user_id: Option<String>,
}

impl SlackEvent {
    /// Interpret an `events_api` envelope payload. Events the bot does not
    /// handle (and its own messages) yield `None`.
    pub fn from_events_api(payload: &Value) -> Result<Option<Self>> {
        let callback = serde_json::from_value::<EventCallback>(payload.clone())
            .context("failed to decode slack event callback payload")?;
        if callback.callback_type != "event_callback" {
            return Ok(None);
        }

        let event = callback.event;
        let mut message = event.message;
        if non_empty(message.team.as_deref()).is_none() {
            message.team = callback.team_id;
        }

        let parsed = match event.event_type.as_str() {
            "app_mention" => Some(SlackEvent::AppMention(message)),
            "message"
                if event.channel_type.as_deref() == Some("im")
                    && message.thread_ts.is_some()
                    && event.subtype.is_none()
                    && event.bot_id.is_none() =>
            {
                Some(SlackEvent::AssistantMessage(message))
            }
            "assistant_thread_started" => event.assistant_thread.map(|thread| {
                SlackEvent::AssistantThreadStarted(ThreadStarted {
                    channel: thread.channel_id,
                    thread_ts: thread.thread_ts,
                    user: thread.user_id,
                })
            }),
            _ => None,
        };
        Ok(parsed)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SlackEvent::AppMention(_) => "app_mention",
            SlackEvent::AssistantMessage(_) => "assistant_message",
            SlackEvent::AssistantThreadStarted(_) => "assistant_thread_started",
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn callback(event: Value) -> Value {
        json!({"type": "event_callback", "team_id": "T1", "event": event})
    }

    #[test]
    fn test_parse_text_envelope() {
        let frame = json!({
            "envelope_id": "e-1",
            "type": "events_api",
            "payload": {"type": "event_callback"}
        })
        .to_string();

        let envelope = parse_socket_message(WsMessage::Text(frame.into()))
            .unwrap()
            .unwrap();
        assert_eq!(envelope.envelope_id.as_deref(), Some("e-1"));
        assert_eq!(envelope.envelope_type, "events_api");
        assert!(!envelope.is_disconnect());
    }

    #[test]
    fn test_parse_hello_and_control_frames() {
        let hello = parse_socket_message(WsMessage::Text(r#"{"type":"hello"}"#.into()))
            .unwrap()
            .unwrap();
        assert!(hello.envelope_id.is_none());

        assert!(parse_socket_message(WsMessage::Ping(Vec::new().into()))
            .unwrap()
            .is_none());
        assert!(parse_socket_message(WsMessage::Text("not json".into())).is_err());
    }

    #[test]
    fn test_app_mention_takes_team_from_callback() {
        let payload = callback(json!({
            "type": "app_mention",
            "user": "U1",
            "text": "<@B1> explain closures",
            "ts": "1.5",
            "channel": "C1"
        }));

        let Some(SlackEvent::AppMention(event)) = SlackEvent::from_events_api(&payload).unwrap()
        else {
            panic!("expected an app mention");
        };
        assert_eq!(event.team.as_deref(), Some("T1"));
        assert_eq!(event.reply_thread_ts(), Some("1.5"));
    }

    #[test]
    fn test_assistant_message_filters() {
        let dm = json!({
            "type": "message",
            "channel_type": "im",
            "channel": "D1",
            "user": "U1",
            "text": "hello",
            "ts": "2.0",
            "thread_ts": "1.0"
        });
        let parsed = SlackEvent::from_events_api(&callback(dm.clone())).unwrap();
        assert!(matches!(parsed, Some(SlackEvent::AssistantMessage(_))));

        let mut from_bot = dm.clone();
        from_bot["bot_id"] = json!("B1");
        assert!(SlackEvent::from_events_api(&callback(from_bot)).unwrap().is_none());

        let mut edited = dm.clone();
        edited["subtype"] = json!("message_changed");
        assert!(SlackEvent::from_events_api(&callback(edited)).unwrap().is_none());

        let mut channel = dm;
        channel["channel_type"] = json!("channel");
        assert!(SlackEvent::from_events_api(&callback(channel)).unwrap().is_none());
    }

    #[test]
    fn test_assistant_thread_started() {
        let payload = callback(json!({
            "type": "assistant_thread_started",
            "assistant_thread": {"user_id": "U1", "channel_id": "D1", "thread_ts": "3.0"}
        }));

        assert_eq!(
            SlackEvent::from_events_api(&payload).unwrap(),
            Some(SlackEvent::AssistantThreadStarted(ThreadStarted {
                channel: "D1".to_string(),
                thread_ts: "3.0".to_string(),
                user: Some("U1".to_string()),
            }))
        );
    }
}
