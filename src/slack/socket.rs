//! Socket Mode intake: connect, ack every envelope, hand events to
//! [`EventHandlers`] on their own task, and reconnect when Slack asks to or the
//! connection drops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{Sink, SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use super::api::SlackApiClient;
use super::events::{parse_socket_message, SlackEvent, SocketEnvelope};
use super::handlers::EventHandlers;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Why a socket session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}

pub struct SocketModeRunner {
    client: Arc<SlackApiClient>,
    handlers: Arc<EventHandlers>,
    reconnect_delay: Duration,
}

impl SocketModeRunner {
    pub fn new(client: Arc<SlackApiClient>, handlers: Arc<EventHandlers>) -> Self {
        Self {
            client,
            handlers,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.client.open_socket_connection().await {
                Ok(socket_url) => {
                    info!("Socket Mode connected");
                    match self.run_session(&socket_url).await {
                        Ok(SessionEnd::Shutdown) => {
                            info!("Shutdown requested");
                            return Ok(());
                        }
                        Ok(SessionEnd::Reconnect) => info!("Socket Mode session ended, reconnecting"),
                        Err(e) => error!(error = %e, "Socket Mode session error"),
                    }
                }
                Err(e) => error!(error = %e, "Failed to open Socket Mode connection"),
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn run_session(&self, socket_url: &str) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .context("failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message) = maybe_message else {
                        return Ok(SessionEnd::Reconnect);
                    };
                    let message = message.context("failed reading slack websocket message")?;
                    let Some(envelope) = parse_socket_message(message)? else {
                        continue;
                    };
                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        ack_envelope(&mut sink, envelope_id).await?;
                    }
                    if envelope.is_disconnect() {
                        return Ok(SessionEnd::Reconnect);
                    }
                    self.dispatch(envelope);
                }
            }
        }
    }

    fn dispatch(&self, envelope: SocketEnvelope) {
        if envelope.envelope_type != "events_api" {
            debug!(envelope_type = %envelope.envelope_type, "Ignoring envelope");
            return;
        }

        match SlackEvent::from_events_api(&envelope.payload) {
            Ok(Some(event)) => {
                let handlers = Arc::clone(&self.handlers);
                tokio::spawn(async move {
                    handlers.handle(event).await;
                });
            }
            Ok(None) => debug!("Ignoring unhandled event"),
            Err(e) => warn!(error = %e, "Dropping malformed event"),
        }
    }
}

async fn ack_envelope<S>(sink: &mut S, envelope_id: &str) -> Result<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let ack = json!({ "envelope_id": envelope_id }).to_string();
    sink.send(WsMessage::Text(ack.into()))
        .await
        .context("failed to send slack socket ack")
}
