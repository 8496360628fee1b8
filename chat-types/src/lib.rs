//! # chat-types
//!
//! Wire format and domain types for the chatsync conversation engine.
//!
//! This crate provides the foundational types used across all chatsync crates:
//! - [`ConversationId`], [`UserId`], [`MessageId`], [`LocalId`] - Identity types
//! - [`Message`], [`MessageStatus`] - The timeline's rendering unit
//! - [`RemoteMessage`] and the request bodies - JSON shapes of the chat backend
//! - [`ApiEnvelope`] - The `{ status, data }` response wrapper
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod messages;

pub use envelope::{ApiEnvelope, PageData};
pub use error::WireError;
pub use ids::{ConversationId, LocalId, MessageId, UserId};
pub use messages::{
    FetchPageRequest, MarkReadRequest, Message, MessageStatus, RemoteMessage, SendMessageRequest,
    TEXT_MESSAGE_TYPE,
};
