//! Configuration for the sync engine.
//!
//! Loaded from a TOML file or built in code; every field has a default.

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for a [`crate::SyncController`].
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Cadence of the history refresh in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Allowed clock skew when matching an optimistic entry to a confirmed
    /// record, in milliseconds (default: 5000).
    #[serde(default = "default_match_tolerance_ms")]
    pub match_tolerance_ms: u64,
    /// Base URL of the REST history endpoint.
    #[serde(default = "default_history_base_url")]
    pub history_base_url: String,
    /// Base URL of the realtime channel endpoint.
    #[serde(default = "default_socket_base_url")]
    pub socket_base_url: String,
}

impl SyncConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// The poll interval as a [`std::time::Duration`].
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// The match tolerance as a [`chrono::Duration`].
    pub fn match_tolerance(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.match_tolerance_ms as i64)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            match_tolerance_ms: default_match_tolerance_ms(),
            history_base_url: default_history_base_url(),
            socket_base_url: default_socket_base_url(),
        }
    }
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_match_tolerance_ms() -> u64 {
    5000
}

fn default_history_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_socket_base_url() -> String {
    "ws://localhost:8080".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_cadence() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.match_tolerance_ms, 5000);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = SyncConfig::from_toml("").unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.history_base_url, "http://localhost:8080");
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = SyncConfig::from_toml(
            r#"
            poll_interval_ms = 250
            history_base_url = "http://chat.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.history_base_url, "http://chat.example.com");
        // Untouched fields keep defaults.
        assert_eq!(config.match_tolerance_ms, 5000);
    }

    #[test]
    fn durations_convert_from_millis() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval(), std::time::Duration::from_millis(1000));
        assert_eq!(config.match_tolerance(), chrono::Duration::milliseconds(5000));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            SyncConfig::from_toml("poll_interval_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
