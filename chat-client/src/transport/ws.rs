//! WebSocket transport over tokio-tungstenite.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chat_types::{ConversationId, UserId};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport over a WebSocket channel.
///
/// Joins `{base_url}/ws/joinConversation/{conversationId}?userId={id}` and
/// pushes raw text frames. Incoming frames are not read: the channel carries
/// no structured acknowledgements, so there is nothing to consume.
pub struct WsTransport {
    base_url: String,
    stream: Mutex<Option<WsStream>>,
    connected: AtomicBool,
}

impl WsTransport {
    /// Create a transport for the given WebSocket base URL
    /// (e.g. `ws://chat.example.com`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn channel_url(&self, conversation: ConversationId, identity: UserId) -> String {
        format!(
            "{}/ws/joinConversation/{}?userId={}",
            self.base_url, conversation, identity
        )
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(
        &self,
        conversation: ConversationId,
        identity: UserId,
    ) -> Result<(), TransportError> {
        let url = self.channel_url(conversation, identity);
        tracing::debug!(%url, "opening realtime channel");

        let (stream, _) = connect_async(&url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, content: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        match stream.send(WsMessage::Text(content.to_string().into())).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Channel is no longer usable; release it.
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                Err(TransportError::SendFailed(e.to_string()))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut stream) = guard.take() {
            // Best-effort close frame; the channel is gone either way.
            if let Err(e) = stream.close(None).await {
                tracing::debug!(error = %e, "close frame not delivered");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_url_matches_the_join_endpoint() {
        let transport = WsTransport::new("ws://chat.example.com/");
        let url = transport.channel_url(ConversationId::new(42), UserId::new(7));
        assert_eq!(url, "ws://chat.example.com/ws/joinConversation/42?userId=7");
    }

    #[test]
    fn starts_disconnected() {
        let transport = WsTransport::new("ws://chat.example.com");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn send_without_connect_reports_not_connected() {
        let transport = WsTransport::new("ws://chat.example.com");
        let result = transport.send("hi").await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let transport = WsTransport::new("ws://chat.example.com");
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }
}
