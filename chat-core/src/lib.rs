//! # chat-core
//!
//! Pure logic for chatsync (no I/O, instant tests).
//!
//! This crate implements the connection state machine and the
//! reconciliation algorithm without any network I/O, enabling fast unit
//! tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Atomic merges: a merge runs to completion without suspension
//!
//! The actual I/O (WebSocket sends, history fetches) is performed by
//! `chat-client`, which drives these modules from its event loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod reconcile;
pub mod timeline;

pub use connection::{ConnectionAction, ConnectionEvent, ConnectionState};
pub use reconcile::Reconciler;
pub use timeline::Timeline;
