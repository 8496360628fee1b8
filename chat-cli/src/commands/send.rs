//! Send a message.

use anyhow::{bail, Result};
use chat_client::{ConversationController, ConversationTransport, SendOutcome, SessionAccessor};
use chat_types::ConversationId;

use super::explain;

/// Run the send command.
pub async fn run<T, S>(
    controller: &ConversationController<T, S>,
    chat_id: ConversationId,
    text: &str,
) -> Result<()>
where
    T: ConversationTransport,
    S: SessionAccessor,
{
    controller.open(chat_id.clone()).await.map_err(explain)?;
    let outcome = controller.send(text).await.map_err(explain)?;
    controller.close().await?;

    match outcome {
        SendOutcome::Confirmed(id) => {
            println!("Sent message {} to conversation {}", id, chat_id);
            Ok(())
        }
        SendOutcome::Rejected => bail!("Message is empty; nothing sent"),
        SendOutcome::Failed(kind) => bail!("Send failed ({} error)", kind),
        SendOutcome::Discarded => bail!("Conversation closed before the send completed"),
    }
}
