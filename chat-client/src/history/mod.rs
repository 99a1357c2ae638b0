//! Authoritative history read path.
//!
//! A [`HistoryFetcher`] retrieves the full ordered message set for a
//! conversation from the durable store. Each call is a stateless snapshot
//! request with no side effects beyond the network call; the controller
//! serializes polls, so implementations need no internal coordination.

mod http;
mod mock;

pub use http::HttpHistoryFetcher;
pub use mock::MockHistory;

use async_trait::async_trait;
use chat_types::{ConversationId, MessageRecord};
use thiserror::Error;

/// History fetch errors. Non-fatal: the poll is retried on the next tick
/// and the prior timeline is preserved unchanged.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request failed to reach the store or came back malformed.
    #[error("network error: {0}")]
    Network(String),

    /// The conversation does not exist on the server.
    #[error("conversation {0} not found")]
    NotFound(ConversationId),
}

/// Read-side access to the authoritative message history.
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Fetch the full confirmed history for a conversation.
    async fn fetch(&self, conversation: ConversationId) -> Result<Vec<MessageRecord>, FetchError>;
}
