//! # chat-client
//!
//! Async transport, history polling and sync orchestration for chatsync.
//!
//! This is the crate applications embed to back an open conversation view.
//!
//! ## Architecture
//!
//! ```text
//! UI layer → SyncController ─┬→ TransportSession → Transport → realtime channel
//!                            ├→ HistoryFetcher → REST history endpoint
//!                            └→ Reconciler (chat-core, pure, in-memory)
//! ```
//!
//! The controller owns the polling cadence and the transport lifecycle for
//! the active conversation, and publishes the merged timeline plus a
//! connectivity indicator through `tokio::sync::watch` channels. The UI layer
//! consumes those and calls [`SyncController::send_message`]; there is no
//! other mutation surface.
//!
//! ## Example
//!
//! ```ignore
//! use chatsync_client::{SyncConfig, SyncController, WsTransport, HttpHistoryFetcher};
//! use chat_types::{ConversationId, UserId};
//!
//! let config = SyncConfig::default();
//! let transport = WsTransport::new(&config.socket_base_url);
//! let history = HttpHistoryFetcher::new(&config.history_base_url)?;
//! let mut controller = SyncController::new(config, UserId::new(7), transport, history);
//!
//! controller.bind(ConversationId::new(42)).await;
//! let timeline = controller.timeline();
//! controller.send_message("hi").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod history;
pub mod session;
pub mod transport;

pub use config::{ConfigError, SyncConfig};
pub use controller::{BindingState, ControllerError, SyncController};
pub use history::{FetchError, HistoryFetcher, HttpHistoryFetcher, MockHistory};
pub use session::TransportSession;
pub use transport::{MockTransport, Transport, TransportError, WsTransport};
