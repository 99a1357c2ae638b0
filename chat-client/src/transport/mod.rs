//! Transport abstraction for the realtime send channel.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying connection mechanism (WebSocket, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` joins the channel for one conversation
//! - `send()` transmits raw message text
//! - `close()` gracefully terminates
//!
//! The channel carries newly authored content only; it does not carry
//! history, and no structured acknowledgement is expected on it. Durable
//! confirmation comes exclusively through the polled history read path.

mod mock;
mod ws;

pub use mock::MockTransport;
pub use ws::WsTransport;

use async_trait::async_trait;
use chat_types::{ConversationId, UserId};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Send failed mid-session.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Connection closed by the remote end.
    #[error("connection closed")]
    Closed,
}

/// Transport trait for the realtime send channel.
///
/// Implementations handle the underlying connection mechanism
/// (WebSocket, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Join the channel for the given conversation as the given user.
    async fn connect(
        &self,
        conversation: ConversationId,
        identity: UserId,
    ) -> Result<(), TransportError>;

    /// Send raw message text over the channel.
    ///
    /// Carries no delivery guarantee; confirmation arrives via the history
    /// poll path.
    async fn send(&self, content: &str) -> Result<(), TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the channel gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
