//! Transport abstraction for chatsync.
//!
//! This module provides the stateless boundary to the chat backend
//! (HTTP in production, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request-oriented:
//! - `fetch_page()` returns one page of messages, newest first
//! - `send_message()` stores a message and returns it confirmed
//! - `mark_read()` flags the conversation as read
//!
//! Every call carries the bearer credential explicitly. Transports hold no
//! conversation state and never retry.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! let page = transport.fetch_page(&credential, &chat_id, 20, 0).await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{Call, DeferredReply, MockTransport};

use async_trait::async_trait;
use chat_core::ErrorKind;
use chat_types::{ConversationId, Message};
use thiserror::Error;

use crate::session::Credential;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend could not be reached or did not answer in time.
    #[error("network error: {0}")]
    Network(String),

    /// Missing or rejected credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend rejected the message content.
    #[error("rejected by server: {0}")]
    Validation(String),

    /// Unexpected response.
    #[error("server error (HTTP {status}): {body}")]
    Server {
        /// HTTP status of the response.
        status: u16,
        /// Response body or decoding failure.
        body: String,
    },
}

impl TransportError {
    /// Transport-independent classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
        }
    }
}

/// Transport trait for the three remote conversation operations.
///
/// Implementations handle the underlying request mechanism
/// (HTTP, mock, etc).
#[async_trait]
pub trait ConversationTransport: Send + Sync {
    /// Fetch up to `limit` messages, skipping the `offset` newest.
    ///
    /// Messages are returned in remote order, newest first.
    async fn fetch_page(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, TransportError>;

    /// Send a text message and return it as confirmed by the backend.
    async fn send_message(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
        content: &str,
    ) -> Result<Message, TransportError>;

    /// Mark the conversation as read for the signed-in user.
    async fn mark_read(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
    ) -> Result<(), TransportError>;
}
