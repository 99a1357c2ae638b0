//! Transport session: one live send channel per active conversation.
//!
//! [`TransportSession`] drives the pure [`ConnectionState`] machine from
//! `chat-core` around the raw [`Transport`] calls, interpreting the actions
//! the machine produces. It enforces the session contract: `open` is
//! idempotent per conversation and closes a session bound to a different
//! conversation first; `send` is valid only while open; `close` is always
//! safe.
//!
//! Retry policy lives in the controller. A failed open lands silently in
//! `Disconnected`; a mid-session send error forces `Disconnected` and leaves
//! re-resolution to the optimistic path and the next history poll.

use chat_core::{ConnectionAction, ConnectionEvent, ConnectionState};
use chat_types::{ConversationId, UserId};

use crate::transport::{Transport, TransportError};

/// A send/receive channel bound to a single conversation identity.
pub struct TransportSession<T: Transport> {
    transport: T,
    state: ConnectionState,
    bound: Option<ConversationId>,
}

impl<T: Transport> TransportSession<T> {
    /// Create a session over the given transport, initially disconnected.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::new(),
            bound: None,
        }
    }

    /// Current connection state, for the connectivity indicator.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The conversation this session is bound to, if any.
    pub fn bound_conversation(&self) -> Option<ConversationId> {
        self.bound
    }

    /// Check whether sends are currently valid.
    pub fn is_open(&self) -> bool {
        self.state.can_send()
    }

    /// Open the channel for a conversation.
    ///
    /// Idempotent per conversation: already open for the same conversation
    /// is a no-op, and a session open for a different conversation is closed
    /// first. A connect failure is swallowed: the session lands in
    /// `Disconnected` and the caller decides when to try again.
    pub async fn open(&mut self, conversation: ConversationId, identity: UserId) {
        if self.is_open() && self.bound == Some(conversation) {
            return;
        }
        if self.bound.is_some() && self.bound != Some(conversation) {
            self.close().await;
        }

        self.bound = Some(conversation);
        let actions = self.apply(ConnectionEvent::OpenRequested);
        if !actions
            .iter()
            .any(|a| matches!(a, ConnectionAction::Connect))
        {
            return;
        }

        match self.transport.connect(conversation, identity).await {
            Ok(()) => {
                self.apply(ConnectionEvent::OpenSucceeded);
                tracing::debug!(%conversation, "realtime channel open");
            }
            Err(e) => {
                self.apply(ConnectionEvent::OpenFailed {
                    error: e.to_string(),
                });
                tracing::warn!(%conversation, error = %e, "realtime channel open failed");
            }
        }
    }

    /// Send raw message text.
    ///
    /// Valid only in `Open`; otherwise reports `NotConnected` without side
    /// effects. A mid-session error forces `Disconnected`.
    pub async fn send(&mut self, content: &str) -> Result<(), TransportError> {
        if !self.state.can_send() {
            return Err(TransportError::NotConnected);
        }

        match self.transport.send(content).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.apply(ConnectionEvent::TransportFailed {
                    error: e.to_string(),
                });
                tracing::warn!(error = %e, "realtime channel failed mid-session");
                Err(e)
            }
        }
    }

    /// Close the channel and release it. Always safe, idempotent.
    pub async fn close(&mut self) {
        let actions = self.apply(ConnectionEvent::CloseRequested);
        if actions
            .iter()
            .any(|a| matches!(a, ConnectionAction::Disconnect))
        {
            if let Err(e) = self.transport.close().await {
                tracing::debug!(error = %e, "transport close reported an error");
            }
            self.apply(ConnectionEvent::CloseFinished);
        }
        self.bound = None;
    }

    /// Feed an event to the state machine and keep the new state.
    fn apply(&mut self, event: ConnectionEvent) -> Vec<ConnectionAction> {
        let (state, actions) = self.state.on_event(event);
        self.state = state;
        actions
    }
}
