//! # chat-types
//!
//! Identity and message types for the chatsync engine.
//!
//! This crate provides the foundational types used across all chatsync
//! crates:
//! - [`ConversationId`], [`UserId`], [`LocalId`], [`MessageId`] - identity
//!   types
//! - [`Message`], [`MessageOrigin`] - the timeline entry and its lifecycle tag
//! - [`MessageRecord`] - the wire record returned by the REST history endpoint

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ids;
mod message;

pub use ids::{ConversationId, LocalId, MessageId, UserId};
pub use message::{Message, MessageOrigin, MessageRecord};
