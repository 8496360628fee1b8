//! Messages and request bodies for chatsync.
//!
//! [`Message`] is the unit the timeline stores and renders. [`RemoteMessage`]
//! is the JSON shape the chat backend returns; it converts into a confirmed
//! [`Message`]. The request structs mirror the backend's POST bodies exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::remote_message_id;
use crate::{ConversationId, LocalId, MessageId, UserId};

/// The only content type this engine sends.
pub const TEXT_MESSAGE_TYPE: &str = "text";

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Sent, awaiting server confirmation.
    Pending,
    /// Acknowledged by the remote store.
    Confirmed,
    /// The send attempt errored.
    Failed,
}

/// A message in a conversation timeline.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Server id once confirmed, temporary local id while optimistic.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: UserId,
    /// Text payload.
    pub content: String,
    /// Server-assigned timestamp; `None` until confirmed.
    pub sent_at: Option<DateTime<Utc>>,
    /// Delivery status.
    pub status: MessageStatus,
}

impl Message {
    /// Create an optimistic (pending) message under a local id.
    pub fn optimistic(
        id: LocalId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::Local(id),
            conversation_id,
            sender_id,
            content: content.into(),
            sent_at: None,
            status: MessageStatus::Pending,
        }
    }

    /// Create a confirmed message.
    pub fn confirmed(
        id: impl Into<String>,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::remote(id),
            conversation_id,
            sender_id,
            content: content.into(),
            sent_at: Some(sent_at),
            status: MessageStatus::Confirmed,
        }
    }

    /// Whether the given user authored this message.
    pub fn is_own(&self, user: &UserId) -> bool {
        &self.sender_id == user
    }

    /// Check if the message is awaiting confirmation.
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    /// Check if the message has been acknowledged by the server.
    pub fn is_confirmed(&self) -> bool {
        self.status == MessageStatus::Confirmed
    }

    /// Check if the send attempt for this message failed.
    pub fn is_failed(&self) -> bool {
        self.status == MessageStatus::Failed
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("conversation_id", &self.conversation_id)
            .field("sender_id", &self.sender_id)
            .field("content", &format!("[{} chars REDACTED]", self.content.chars().count()))
            .field("sent_at", &self.sent_at)
            .field("status", &self.status)
            .finish()
    }
}

/// A message as returned by the chat backend.
#[derive(Clone, Deserialize)]
pub struct RemoteMessage {
    /// Server-issued identifier.
    #[serde(alias = "_id", deserialize_with = "remote_message_id")]
    pub id: MessageId,
    /// Owning conversation.
    pub chat_id: ConversationId,
    /// Author.
    pub sender_id: UserId,
    /// Payload.
    #[serde(default)]
    pub content: String,
    /// Content type (`"text"` for everything this engine sends).
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    /// Server-assigned timestamp.
    #[serde(alias = "sent_at")]
    pub created_at: DateTime<Utc>,
}

fn default_message_type() -> String {
    TEXT_MESSAGE_TYPE.to_string()
}

impl std::fmt::Debug for RemoteMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMessage")
            .field("id", &self.id)
            .field("chat_id", &self.chat_id)
            .field("sender_id", &self.sender_id)
            .field("content", &"[REDACTED]")
            .field("kind", &self.kind)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl From<RemoteMessage> for Message {
    fn from(remote: RemoteMessage) -> Self {
        Self {
            id: remote.id,
            conversation_id: remote.chat_id,
            sender_id: remote.sender_id,
            content: remote.content,
            sent_at: Some(remote.created_at),
            status: MessageStatus::Confirmed,
        }
    }
}

/// Body of the fetch-page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchPageRequest {
    /// Conversation to page through.
    pub chat_id: ConversationId,
    /// Maximum number of messages to return.
    pub limit: u32,
    /// Number of newest messages to skip.
    pub offset: u32,
}

/// Body of the send-message request.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    /// Target conversation.
    pub chat_id: ConversationId,
    /// Text payload.
    pub content: String,
    /// Content type, always `"text"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl SendMessageRequest {
    /// Create a text send request.
    pub fn text(chat_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: content.into(),
            kind: TEXT_MESSAGE_TYPE,
        }
    }
}

impl std::fmt::Debug for SendMessageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendMessageRequest")
            .field("chat_id", &self.chat_id)
            .field("content", &"[REDACTED]")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Body of the mark-read request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkReadRequest {
    /// Conversation being marked as read.
    pub chat_id: ConversationId,
}
