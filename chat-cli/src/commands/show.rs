//! Print a conversation.

use anyhow::Result;
use chat_client::{ConversationController, ConversationTransport, SessionAccessor};
use chat_types::{ConversationId, UserId};

use super::{explain, format_message};

/// Run the show command.
pub async fn run<T, S>(
    controller: &ConversationController<T, S>,
    chat_id: ConversationId,
    me: &UserId,
    older: u32,
) -> Result<()>
where
    T: ConversationTransport,
    S: SessionAccessor,
{
    controller.open(chat_id.clone()).await.map_err(explain)?;

    for _ in 0..older {
        if controller.history_exhausted().await {
            break;
        }
        controller.load_older().await.map_err(explain)?;
    }

    let messages = controller.messages().await;
    println!("=== conversation {} ({} messages) ===", chat_id, messages.len());
    if messages.is_empty() {
        println!("(no messages)");
    }
    for message in &messages {
        println!("{}", format_message(message, me));
    }

    controller.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo_transport;
    use chat_client::{
        ClientConfig, Credential, MockTransport, Session, StaticSession, TransportError,
    };

    fn controller(transport: MockTransport) -> ConversationController<MockTransport, StaticSession> {
        let session = Session::new(UserId::new("me"), Credential::new("t"));
        ConversationController::new(transport, StaticSession::new(session), ClientConfig::default())
    }

    #[tokio::test]
    async fn show_demo_conversation() {
        let chat = ConversationId::new("c");
        let controller = controller(demo_transport(&chat, &UserId::new("me")));

        let result = run(&controller, chat, &UserId::new("me"), 1).await;

        assert!(result.is_ok());
        assert_eq!(controller.transport().fetch_count(), 2);
        assert_eq!(controller.transport().mark_read_count(), 1);
    }

    #[tokio::test]
    async fn show_reports_load_failure() {
        let transport = MockTransport::new();
        transport.fail_next_fetch(TransportError::Auth("expired".into()));
        let controller = controller(transport);

        let err = run(&controller, ConversationId::new("c"), &UserId::new("me"), 0)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("sign in again"));
    }
}
