//! Mock transport for testing.
//!
//! Allows queueing replies, holding replies back until the test releases
//! them, and capturing every call for verification.

use super::{ConversationTransport, TransportError};
use crate::session::Credential;
use async_trait::async_trait;
use chat_types::{ConversationId, Message, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

/// A call the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `fetch_page`.
    FetchPage {
        /// Requested conversation.
        conversation: ConversationId,
        /// Page size.
        limit: u32,
        /// Page offset.
        offset: u32,
    },
    /// `send_message`.
    SendMessage {
        /// Target conversation.
        conversation: ConversationId,
        /// Message text.
        content: String,
    },
    /// `mark_read`.
    MarkRead {
        /// Conversation marked as read.
        conversation: ConversationId,
    },
}

/// A reply queued for one call.
enum Reply<T> {
    Ready(Result<T, TransportError>),
    Deferred(oneshot::Receiver<Result<T, TransportError>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, TransportError> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(rx) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("deferred reply dropped".into()))),
        }
    }
}

/// Handle that completes a held-back call.
#[derive(Debug)]
pub struct DeferredReply<T> {
    tx: oneshot::Sender<Result<T, TransportError>>,
}

impl<T> DeferredReply<T> {
    /// Complete the call with this result.
    ///
    /// If the caller has gone away the result is dropped.
    pub fn resolve(self, result: Result<T, TransportError>) {
        let _ = self.tx.send(result);
    }
}

/// Mock transport for testing.
///
/// Unqueued fetches return an empty page, unqueued sends are confirmed with
/// a generated id, and mark-read succeeds unless told to fail.
#[derive(Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    called: Arc<Notify>,
}

#[derive(Default)]
struct MockTransportInner {
    calls: Vec<Call>,
    fetch_replies: VecDeque<Reply<Vec<Message>>>,
    send_replies: VecDeque<Reply<Message>>,
    fail_next_mark_read: Option<TransportError>,
    sender: Option<UserId>,
    next_id: u64,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Author of auto-confirmed sends (default: `"me"`).
    pub fn with_sender(self, sender: UserId) -> Self {
        self.inner.lock().unwrap().sender = Some(sender);
        self
    }

    /// Queue a page for the next `fetch_page()` call (newest first).
    pub fn queue_page(&self, page: Vec<Message>) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_replies.push_back(Reply::Ready(Ok(page)));
    }

    /// Queue a confirmed message for the next `send_message()` call.
    pub fn queue_sent(&self, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        inner.send_replies.push_back(Reply::Ready(Ok(message)));
    }

    /// Cause the next `fetch_page()` to fail with the given error.
    pub fn fail_next_fetch(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_replies.push_back(Reply::Ready(Err(error)));
    }

    /// Cause the next `send_message()` to fail with the given error.
    pub fn fail_next_send(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.send_replies.push_back(Reply::Ready(Err(error)));
    }

    /// Cause the next `mark_read()` to fail with the given error.
    pub fn fail_next_mark_read(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_mark_read = Some(error);
    }

    /// Hold the next `fetch_page()` until the returned handle resolves it.
    pub fn defer_fetch(&self) -> DeferredReply<Vec<Message>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_replies.push_back(Reply::Deferred(rx));
        DeferredReply { tx }
    }

    /// Hold the next `send_message()` until the returned handle resolves it.
    pub fn defer_send(&self) -> DeferredReply<Message> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        inner.send_replies.push_back(Reply::Deferred(rx));
        DeferredReply { tx }
    }

    /// Get all calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of `fetch_page()` calls.
    pub fn fetch_count(&self) -> usize {
        self.count(|c| matches!(c, Call::FetchPage { .. }))
    }

    /// Number of `send_message()` calls.
    pub fn send_count(&self) -> usize {
        self.count(|c| matches!(c, Call::SendMessage { .. }))
    }

    /// Number of `mark_read()` calls.
    pub fn mark_read_count(&self) -> usize {
        self.count(|c| matches!(c, Call::MarkRead { .. }))
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Wait until at least `n` calls have been received.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.called.notified();
            if self.inner.lock().unwrap().calls.len() >= n {
                return;
            }
            notified.await;
        }
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
        self.called.notify_waiters();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            called: Arc::clone(&self.called),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MockTransport")
            .field("calls", &inner.calls.len())
            .field("queued_fetches", &inner.fetch_replies.len())
            .field("queued_sends", &inner.send_replies.len())
            .finish()
    }
}

#[async_trait]
impl ConversationTransport for MockTransport {
    async fn fetch_page(
        &self,
        _credential: &Credential,
        conversation: &ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, TransportError> {
        let reply = self.inner.lock().unwrap().fetch_replies.pop_front();
        self.record(Call::FetchPage {
            conversation: conversation.clone(),
            limit,
            offset,
        });

        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn send_message(
        &self,
        _credential: &Credential,
        conversation: &ConversationId,
        content: &str,
    ) -> Result<Message, TransportError> {
        let (reply, confirmed) = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_id += 1;
            let confirmed = Message::confirmed(
                format!("srv-{}", inner.next_id),
                conversation.clone(),
                inner.sender.clone().unwrap_or_else(|| UserId::new("me")),
                content,
                chrono::Utc::now(),
            );
            (inner.send_replies.pop_front(), confirmed)
        };
        self.record(Call::SendMessage {
            conversation: conversation.clone(),
            content: content.to_string(),
        });

        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(confirmed),
        }
    }

    async fn mark_read(
        &self,
        _credential: &Credential,
        conversation: &ConversationId,
    ) -> Result<(), TransportError> {
        let failure = self.inner.lock().unwrap().fail_next_mark_read.take();
        self.record(Call::MarkRead {
            conversation: conversation.clone(),
        });

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
