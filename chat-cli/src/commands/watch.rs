//! Poll a conversation for new messages.

use anyhow::Result;
use chat_client::{ConversationController, ConversationTransport, SessionAccessor};
use chat_types::{ConversationId, MessageId, UserId};
use std::collections::HashSet;
use std::time::Duration;

use super::{explain, format_message};

/// Run the watch command.
pub async fn run<T, S>(
    controller: &ConversationController<T, S>,
    chat_id: ConversationId,
    me: &UserId,
    interval_secs: u64,
    rounds: u32,
) -> Result<()>
where
    T: ConversationTransport,
    S: SessionAccessor,
{
    controller.open(chat_id.clone()).await.map_err(explain)?;
    println!("Watching conversation {} ({} polls)", chat_id, rounds);

    let mut printed = HashSet::new();
    print_new(controller, me, &mut printed).await;

    for round in 1..=rounds {
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;

        match controller.refresh().await {
            Ok(report) if report.added > 0 => print_new(controller, me, &mut printed).await,
            Ok(_) => {}
            // Keep polling; the next round may succeed
            Err(e) => tracing::warn!(round, error = %e, "refresh failed"),
        }
    }

    controller.close().await?;
    Ok(())
}

async fn print_new<T, S>(
    controller: &ConversationController<T, S>,
    me: &UserId,
    printed: &mut HashSet<MessageId>,
) where
    T: ConversationTransport,
    S: SessionAccessor,
{
    for message in controller.messages().await {
        if printed.insert(message.id.clone()) {
            println!("{}", format_message(&message, me));
        }
    }
}
