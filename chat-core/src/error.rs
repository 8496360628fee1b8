//! Error classification for chatsync.

use chat_types::{ConversationId, LocalId};
use thiserror::Error;

/// Classification of a failed remote operation.
///
/// This is the transport-independent view of an error: enough to decide
/// what the user sees, without HTTP details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or rejected credential.
    Auth,
    /// Connectivity failure.
    Network,
    /// The backend rejected the payload.
    Validation,
    /// Unexpected remote failure.
    Server,
}

/// What the presentation layer should offer for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recovery {
    /// Prompt the user to sign in again. Never retried locally.
    Reauthenticate,
    /// Dismissible banner with a manual retry.
    RetryBanner,
    /// Mark the affected optimistic message as failed; nothing else changes.
    MarkFailed,
}

impl ErrorKind {
    /// How the user should be offered to recover.
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Auth => Recovery::Reauthenticate,
            Self::Network | Self::Server => Recovery::RetryBanner,
            Self::Validation => Recovery::MarkFailed,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Server => "server",
        };
        f.write_str(name)
    }
}

/// Errors from timeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// No optimistic message with this id exists in the timeline.
    #[error("unknown local message: {0}")]
    UnknownLocalId(LocalId),

    /// The optimistic message has already resolved.
    #[error("message {0} is not pending")]
    NotPending(LocalId),

    /// The message is not in the failed state.
    #[error("message {0} has not failed")]
    NotFailed(LocalId),

    /// A confirmed message belongs to a different conversation.
    #[error("message belongs to conversation {actual}, timeline is {expected}")]
    ConversationMismatch {
        /// The timeline's conversation.
        expected: ConversationId,
        /// The conversation named by the message.
        actual: ConversationId,
    },
}
