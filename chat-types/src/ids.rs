//! Identity types for chatsync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A server-assigned identifier for a conversation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(u64);

impl ConversationId {
    /// Create a ConversationId with the given value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this ConversationId.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConversationId({})", self.0)
    }
}

/// A server-assigned identifier for a user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a UserId with the given value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this UserId.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// A client-generated identifier for a timeline entry.
///
/// Minted the instant a send is requested, unique per client session, and
/// present on every entry independent of server confirmation. UUID v4 format.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(uuid::Uuid);

impl LocalId {
    /// Mint a new random LocalId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

/// The stable identity of a server-confirmed message.
///
/// The history endpoint carries no server-assigned id, so the identity is
/// synthesized from `conversation-sender-createdAt_millis`. Two polls that
/// return the same record produce the same MessageId.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Derive the identity of a confirmed record from its fields.
    pub fn derive(
        conversation: ConversationId,
        sender: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self(format!(
            "{}-{}-{}",
            conversation,
            sender,
            created_at.timestamp_millis()
        ))
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}
