//! Connection state machine for the realtime send channel.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the lifecycle of one transport session. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (connecting, sending, closing) is performed by
//! `chat-client`, not by this module. Retry policy also lives above: a failed
//! open or a mid-session error lands in `Disconnected` and stays there until
//! the controller asks for a new open.

/// Connection state machine - NO I/O, just state transitions.
///
/// Bound 1:1 to a conversation identity; the session owning this machine is
/// torn down and recreated whenever the bound conversation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live channel.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Channel is live; sends are valid.
    Open,
    /// Graceful teardown in progress.
    Closing,
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (chat-client)
    /// is responsible for executing the returned actions. Invalid
    /// transitions keep the current state and produce no actions.
    pub fn on_event(self, event: ConnectionEvent) -> (Self, Vec<ConnectionAction>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, ConnectionEvent::OpenRequested) => {
                (Self::Connecting, vec![ConnectionAction::Connect])
            }
            // close() is always safe and idempotent
            (Self::Disconnected, ConnectionEvent::CloseRequested) => (Self::Disconnected, vec![]),

            // From Connecting
            (Self::Connecting, ConnectionEvent::OpenSucceeded) => (
                Self::Open,
                vec![ConnectionAction::Publish(Self::Open)],
            ),
            // Fails silently into Disconnected; no retry here
            (Self::Connecting, ConnectionEvent::OpenFailed { .. }) => (
                Self::Disconnected,
                vec![ConnectionAction::Publish(Self::Disconnected)],
            ),
            (Self::Connecting, ConnectionEvent::CloseRequested) => {
                (Self::Closing, vec![ConnectionAction::Disconnect])
            }

            // From Open
            (Self::Open, ConnectionEvent::TransportFailed { .. }) => (
                Self::Disconnected,
                vec![ConnectionAction::Publish(Self::Disconnected)],
            ),
            (Self::Open, ConnectionEvent::CloseRequested) => {
                (Self::Closing, vec![ConnectionAction::Disconnect])
            }

            // From Closing
            (Self::Closing, ConnectionEvent::CloseFinished) => (
                Self::Disconnected,
                vec![ConnectionAction::Publish(Self::Disconnected)],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if sends are currently valid.
    pub fn can_send(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if a connection attempt is in progress.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The controller requested an open for the bound conversation.
    OpenRequested,
    /// The transport connection succeeded.
    OpenSucceeded,
    /// The transport connection failed.
    OpenFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// A mid-session transport error occurred (send failed, channel died).
    TransportFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The controller requested a close.
    CloseRequested,
    /// The channel has been released.
    CloseFinished,
}

/// Actions to be executed by chat-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Initiate the transport connection.
    Connect,
    /// Release the transport channel.
    Disconnect,
    /// Publish a state change for the connectivity indicator.
    Publish(ConnectionState),
}
