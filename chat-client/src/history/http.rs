//! REST history fetcher over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use chat_types::{ConversationId, MessageRecord};
use reqwest::{Client, StatusCode};

use super::{FetchError, HistoryFetcher};

/// Fetches conversation history from the REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpHistoryFetcher {
    client: Client,
    base_url: String,
}

impl HttpHistoryFetcher {
    /// Create a fetcher for the given REST base URL
    /// (e.g. `http://chat.example.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        let base_url = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn history_url(&self, conversation: ConversationId) -> String {
        format!("{}/conversations/{}/messages", self.base_url, conversation)
    }
}

#[async_trait]
impl HistoryFetcher for HttpHistoryFetcher {
    async fn fetch(&self, conversation: ConversationId) -> Result<Vec<MessageRecord>, FetchError> {
        let url = self.history_url(conversation);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(conversation)),
            status if !status.is_success() => {
                Err(FetchError::Network(format!("unexpected status {status}")))
            }
            _ => response
                .json::<Vec<MessageRecord>>()
                .await
                .map_err(|e| FetchError::Network(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructing_the_client_reports_errors_instead_of_panicking() {
        assert!(HttpHistoryFetcher::new("http://chat.example.com").is_ok());
    }

    #[test]
    fn history_url_targets_the_conversation() {
        let fetcher = HttpHistoryFetcher::new("http://chat.example.com/").unwrap();
        assert_eq!(
            fetcher.history_url(ConversationId::new(42)),
            "http://chat.example.com/conversations/42/messages"
        );
    }
}
