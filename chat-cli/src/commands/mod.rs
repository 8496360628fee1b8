//! CLI command implementations.

pub mod send;
pub mod show;
pub mod watch;

use chat_client::{ClientError, MockTransport};
use chat_core::Recovery;
use chat_types::{ConversationId, Message, MessageStatus, UserId};
use chrono::{Duration, Utc};

/// Render one message as a single line.
pub fn format_message(message: &Message, me: &UserId) -> String {
    let time = message
        .sent_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string());
    let author = if message.is_own(me) {
        "you".to_string()
    } else {
        message.sender_id.to_string()
    };
    let status = match message.status {
        MessageStatus::Confirmed => "",
        MessageStatus::Pending => " (sending)",
        MessageStatus::Failed => " (failed)",
    };
    format!("[{}] {}: {}{}", time, author, message.content, status)
}

/// Attach a recovery hint to a controller error.
pub fn explain(err: ClientError) -> anyhow::Error {
    let hint = match err.kind().map(|kind| kind.recovery()) {
        Some(Recovery::Reauthenticate) => "Authentication failed; sign in again (check --token)",
        Some(Recovery::RetryBanner) => "Backend unavailable; check the connection and retry",
        Some(Recovery::MarkFailed) => "The backend rejected the request",
        None => return err.into(),
    };
    anyhow::Error::new(err).context(hint)
}

/// In-memory transport preloaded with a short demo conversation.
pub fn demo_transport(chat_id: &ConversationId, me: &UserId) -> MockTransport {
    let transport = MockTransport::new().with_sender(me.clone());
    let now = Utc::now();
    let friend = UserId::new("demo-friend");

    // Newest first, as the backend delivers pages
    transport.queue_page(vec![
        Message::confirmed(
            "demo-3",
            chat_id.clone(),
            friend.clone(),
            "See you there.",
            now - Duration::minutes(1),
        ),
        Message::confirmed(
            "demo-2",
            chat_id.clone(),
            me.clone(),
            "Sure, 7pm?",
            now - Duration::minutes(3),
        ),
        Message::confirmed(
            "demo-1",
            chat_id.clone(),
            friend,
            "Dinner tonight?",
            now - Duration::minutes(5),
        ),
    ]);
    transport
}
