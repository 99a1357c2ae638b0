//! Mock transport for testing.
//!
//! Records connects and sent text, and allows forcing failures and dropping
//! the connection mid-session.

use super::{Transport, TransportError};
use async_trait::async_trait;
use chat_types::{ConversationId, UserId};
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle for verification while
/// the session owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    joined: Option<(ConversationId, UserId)>,
    connect_log: Vec<(ConversationId, UserId)>,
    sent: Vec<String>,
    close_count: u32,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation/identity of the current connection, if any.
    pub fn joined(&self) -> Option<(ConversationId, UserId)> {
        self.inner.lock().unwrap().joined
    }

    /// Every connect that was made, in order.
    pub fn connect_log(&self) -> Vec<(ConversationId, UserId)> {
        self.inner.lock().unwrap().connect_log.clone()
    }

    /// All text that was sent.
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of close() calls observed.
    pub fn close_count(&self) -> u32 {
        self.inner.lock().unwrap().close_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_send = Some(error.to_string());
    }

    /// Simulate a mid-session channel loss.
    pub fn drop_connection(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.joined = None;
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        conversation: ConversationId,
        identity: UserId,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.joined = Some((conversation, identity));
        inner.connect_log.push((conversation, identity));
        Ok(())
    }

    async fn send(&self, content: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(content.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.joined = None;
        inner.close_count += 1;
        Ok(())
    }
}
