//! Mock history fetcher for testing.
//!
//! Serves per-conversation records, and allows forcing failures and
//! injecting latency to exercise racing-poll scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_types::{ConversationId, MessageRecord};

use super::{FetchError, HistoryFetcher};

/// Mock history fetcher for testing.
///
/// Clones share state. A conversation with no configured history answers
/// `NotFound`.
#[derive(Debug, Default)]
pub struct MockHistory {
    inner: Arc<Mutex<MockHistoryInner>>,
}

#[derive(Debug, Default)]
struct MockHistoryInner {
    histories: HashMap<ConversationId, Vec<MessageRecord>>,
    fail_next: Option<FetchError>,
    delay: Option<Duration>,
    fetch_count: u64,
}

impl MockHistory {
    /// Create a new mock with no conversations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored history for a conversation.
    pub fn set_history(&self, conversation: ConversationId, records: Vec<MessageRecord>) {
        let mut inner = self.inner.lock().unwrap();
        inner.histories.insert(conversation, records);
    }

    /// Append one record to a conversation's history, creating it if needed.
    pub fn push_record(&self, record: MessageRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .histories
            .entry(record.conversation_id)
            .or_default()
            .push(record);
    }

    /// Cause the next fetch() to fail with the given error.
    pub fn fail_next(&self, error: FetchError) {
        self.inner.lock().unwrap().fail_next = Some(error);
    }

    /// Delay every fetch() by the given duration (for race scenarios).
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    /// Number of fetch() calls observed.
    pub fn fetch_count(&self) -> u64 {
        self.inner.lock().unwrap().fetch_count
    }
}

impl Clone for MockHistory {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl HistoryFetcher for MockHistory {
    async fn fetch(&self, conversation: ConversationId) -> Result<Vec<MessageRecord>, FetchError> {
        // Snapshot at request time, like a real store: a delayed response
        // carries the data as of when the request arrived.
        let (result, delay) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_count += 1;
            let result = match inner.fail_next.take() {
                Some(error) => Err(error),
                None => inner
                    .histories
                    .get(&conversation)
                    .cloned()
                    .ok_or(FetchError::NotFound(conversation)),
            };
            (result, inner.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chat_types::UserId;

    const CONV: ConversationId = ConversationId::new(1);

    fn record(content: &str) -> MessageRecord {
        MessageRecord::new(
            CONV,
            UserId::new(2),
            content,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn fetch_returns_configured_records() {
        let history = MockHistory::new();
        history.set_history(CONV, vec![record("hi")]);

        let records = history.fetch(CONV).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "hi");
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let history = MockHistory::new();
        let result = history.fetch(CONV).await;
        assert!(matches!(result, Err(FetchError::NotFound(c)) if c == CONV));
    }

    #[tokio::test]
    async fn forced_failure_is_one_shot() {
        let history = MockHistory::new();
        history.set_history(CONV, vec![]);
        history.fail_next(FetchError::Network("connection reset".into()));

        assert!(matches!(
            history.fetch(CONV).await,
            Err(FetchError::Network(_))
        ));
        assert!(history.fetch(CONV).await.is_ok());
    }

    #[tokio::test]
    async fn push_record_appends() {
        let history = MockHistory::new();
        history.push_record(record("one"));
        history.push_record(record("two"));

        let records = history.fetch(CONV).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn delayed_fetch_returns_request_time_data() {
        let history = MockHistory::new();
        history.set_history(CONV, vec![record("early")]);
        history.set_delay(Duration::from_millis(30));

        let in_flight = history.fetch(CONV);
        let while_pending = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            history.push_record(record("late"));
        };
        let (records, _) = tokio::join!(in_flight, while_pending);

        assert_eq!(records.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_count_tracks_calls() {
        let history = MockHistory::new();
        history.set_history(CONV, vec![]);
        history.fetch(CONV).await.unwrap();
        history.fetch(CONV).await.unwrap();
        assert_eq!(history.fetch_count(), 2);
    }
}
