//! Message and wire record types for chatsync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, LocalId, MessageId, UserId};

/// Where a timeline entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    /// Shown immediately on local send, not yet confirmed by the server.
    Optimistic,
    /// Returned by the authoritative history read path.
    Confirmed,
}

/// A unit of conversation content as displayed in the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identity once confirmed by the server; absent for optimistic
    /// entries.
    pub id: Option<MessageId>,
    /// Client-generated identity, always present.
    pub local_id: LocalId,
    /// The conversation this message belongs to.
    pub conversation: ConversationId,
    /// The author of the message.
    pub sender: UserId,
    /// The message text.
    pub content: String,
    /// Logical send time.
    pub created_at: DateTime<Utc>,
    /// Optimistic or confirmed.
    pub origin: MessageOrigin,
    /// True if the transport send for this optimistic entry errored.
    /// The entry stays visible as unconfirmed.
    pub send_failed: bool,
}

impl Message {
    /// Create an optimistic entry for a just-requested send.
    pub fn optimistic(
        conversation: ConversationId,
        sender: UserId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            local_id: LocalId::new(),
            conversation,
            sender,
            content: content.into(),
            created_at,
            origin: MessageOrigin::Optimistic,
            send_failed: false,
        }
    }

    /// Build a confirmed entry from a wire record, under the given display
    /// identity.
    pub fn confirmed(record: &MessageRecord, local_id: LocalId) -> Self {
        Self {
            id: Some(record.message_id()),
            local_id,
            conversation: record.conversation_id,
            sender: record.sender_id,
            content: record.content.clone(),
            created_at: record.created_at,
            origin: MessageOrigin::Confirmed,
            send_failed: false,
        }
    }

    /// Check whether this entry is confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.origin == MessageOrigin::Confirmed
    }

    /// Check whether this entry is optimistic (unconfirmed).
    pub fn is_optimistic(&self) -> bool {
        self.origin == MessageOrigin::Optimistic
    }
}

/// A confirmed message record as returned by the REST history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// The message text.
    pub content: String,
    /// Logical send time.
    pub created_at: DateTime<Utc>,
    /// The conversation this record belongs to.
    pub conversation_id: ConversationId,
    /// The author of the message.
    pub sender_id: UserId,
}

impl MessageRecord {
    /// Create a record (mainly for tests and fixtures).
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content: content.into(),
            created_at,
            conversation_id,
            sender_id,
        }
    }

    /// The synthesized stable identity of this record.
    pub fn message_id(&self) -> MessageId {
        MessageId::derive(self.conversation_id, self.sender_id, self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn optimistic_has_no_server_id() {
        let m = Message::optimistic(ConversationId::new(1), UserId::new(2), "hi", at());
        assert!(m.id.is_none());
        assert!(m.is_optimistic());
        assert!(!m.send_failed);
    }

    #[test]
    fn confirmed_carries_derived_id() {
        let record = MessageRecord::new(ConversationId::new(1), UserId::new(2), "hi", at());
        let m = Message::confirmed(&record, LocalId::new());
        assert_eq!(m.id, Some(record.message_id()));
        assert!(m.is_confirmed());
        assert_eq!(m.content, "hi");
    }

    #[test]
    fn record_deserializes_from_camel_case() {
        let json = r#"{
            "content": "hello",
            "createdAt": "2025-03-01T12:00:00Z",
            "conversationId": 7,
            "senderId": 3
        }"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(record.conversation_id, ConversationId::new(7));
        assert_eq!(record.sender_id, UserId::new(3));
        assert_eq!(record.created_at, at());
    }

    #[test]
    fn record_serializes_to_camel_case() {
        let record = MessageRecord::new(ConversationId::new(7), UserId::new(3), "hello", at());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"conversationId\""));
        assert!(json.contains("\"senderId\""));
    }

    #[test]
    fn identical_records_share_an_identity() {
        let a = MessageRecord::new(ConversationId::new(1), UserId::new(2), "hi", at());
        let b = MessageRecord::new(ConversationId::new(1), UserId::new(2), "bye", at());
        // Identity is conversation + sender + time; content is not part of it.
        assert_eq!(a.message_id(), b.message_id());
    }
}
