//! ConversationController - the main interface for chatsync.
//!
//! This module provides [`ConversationController`], the API a conversation
//! screen drives: open, send, retry, refresh, page back and close.
//!
//! # Architecture
//!
//! The controller uses the pure state machine, timeline and read tracker
//! from chat-core and interprets their output to perform I/O via the
//! [`ConversationTransport`] trait.
//!
//! ```text
//! Screen → ConversationController → ConversationTransport → Backend
//!                   ↓
//!              chat-core (pure state machine, timeline)
//! ```
//!
//! All mutable state sits behind one lock that is never held across a
//! transport call. Every suspended operation captures the epoch before
//! awaiting; if a close or a switch to another conversation bumped it in
//! the meantime, the result is discarded without touching any state.
//!
//! # Example
//!
//! ```ignore
//! use chat_client::{ClientConfig, ConversationController, MockTransport, StaticSession};
//!
//! let controller = ConversationController::new(transport, sessions, ClientConfig::default());
//! controller.open(ConversationId::new("42")).await?;
//! controller.send("hello").await?;
//! for message in controller.messages().await { /* render */ }
//! controller.close().await?;
//! ```

use std::sync::Arc;

use chat_core::{
    Action, ConversationEvent, ConversationState, ErrorKind, Event, IngestReport, ReadTracker,
    Resolution, Timeline, TimelineError,
};
use chat_types::{ConversationId, LocalId, Message, MessageId};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::session::{Credential, Session, SessionAccessor};
use crate::transport::{ConversationTransport, TransportError};

/// Capacity of the event channel; slow subscribers miss the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Timeline misuse (unknown or wrong-status message).
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// No conversation is open.
    #[error("no conversation is open")]
    NotOpen,

    /// The conversation was closed or switched while the request was in
    /// flight; its result was dropped.
    #[error("response discarded: conversation closed or switched")]
    Discarded,

    /// The operation is not available in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ClientError {
    /// Classification of the underlying remote failure, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Transport(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result of [`ConversationController::send`].
///
/// A send never surfaces as an error for remote failures; the optimistic
/// message carries the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Content was empty after trimming; nothing was appended.
    Rejected,
    /// The backend stored the message under this id.
    Confirmed(MessageId),
    /// The send failed; the optimistic message is marked failed.
    Failed(ErrorKind),
    /// The conversation was closed or switched before the response arrived.
    Discarded,
}

/// State of the currently open conversation.
struct OpenConversation {
    id: ConversationId,
    /// Read once per mount; `None` while signed out.
    session: Option<Session>,
    timeline: Timeline,
    read: ReadTracker,
    history_exhausted: bool,
}

struct Inner {
    /// Bumped on every close and every switch to another conversation.
    epoch: u64,
    state: ConversationState,
    open: Option<OpenConversation>,
    /// Mutations applied to timelines that have since been released.
    retired_mutations: u64,
}

impl Inner {
    fn release(&mut self) {
        if let Some(open) = self.open.take() {
            self.retired_mutations += open.timeline.revision();
        }
    }
}

/// What a suspended operation needs to finish after the transport returns.
struct Ticket {
    epoch: u64,
    conversation_id: ConversationId,
    credential: Credential,
}

/// The conversation controller.
///
/// Cheap to clone; clones share the same conversation.
pub struct ConversationController<T: ConversationTransport, S: SessionAccessor> {
    transport: Arc<T>,
    sessions: Arc<S>,
    config: ClientConfig,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl<T: ConversationTransport, S: SessionAccessor> Clone for ConversationController<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            sessions: Arc::clone(&self.sessions),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<T: ConversationTransport, S: SessionAccessor> ConversationController<T, S> {
    /// Create a controller with no open conversation.
    pub fn new(transport: T, sessions: S, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport: Arc::new(transport),
            sessions: Arc::new(sessions),
            config,
            inner: Arc::new(Mutex::new(Inner {
                epoch: 0,
                state: ConversationState::new(),
                open: None,
                retired_mutations: 0,
            })),
            events,
        }
    }

    /// Open a conversation and load its newest page.
    ///
    /// Opening the conversation that is already open is a no-op. Opening a
    /// different one closes the current timeline first; its in-flight
    /// responses are discarded.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the first page failed to load (the
    /// controller is then in `Error` and offers [`retry`](Self::retry)), or
    /// [`ClientError::Discarded`] if the conversation was closed meanwhile.
    pub async fn open(&self, conversation_id: ConversationId) -> Result<(), ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if let Some(open) = &inner.open {
                if open.id == conversation_id {
                    debug!(conversation = %conversation_id, "conversation already open");
                    return Ok(());
                }
                info!(from = %open.id, to = %conversation_id, "switching conversation");
                self.dispatch(&mut inner, Event::CloseRequested);
            }

            inner.epoch += 1;
            inner.state = ConversationState::new();
            inner.open = Some(OpenConversation {
                id: conversation_id.clone(),
                session: self.sessions.session(),
                timeline: Timeline::new(conversation_id.clone()),
                read: ReadTracker::new(),
                history_exhausted: false,
            });
            info!(conversation = %conversation_id, epoch = inner.epoch, "opening conversation");
        }

        self.fetch(Event::OpenRequested).await.map(|_| ())
    }

    /// Reload the first page after a failed open.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidState`] unless the controller is in `Error`.
    pub async fn retry(&self) -> Result<(), ClientError> {
        self.fetch(Event::RetryRequested).await.map(|_| ())
    }

    /// Poll the newest page for messages that arrived since the last fetch.
    ///
    /// A failed refresh leaves the list and the state untouched and emits
    /// [`ConversationEvent::RefreshFailed`].
    pub async fn refresh(&self) -> Result<IngestReport, ClientError> {
        self.fetch(Event::RefreshRequested).await
    }

    /// Fetch the page just older than everything loaded so far.
    ///
    /// Returns an empty report once the backend has run out of history.
    pub async fn load_older(&self) -> Result<IngestReport, ClientError> {
        let offset = {
            let inner = self.inner.lock().await;
            let open = inner.open.as_ref().ok_or(ClientError::NotOpen)?;
            if open.history_exhausted {
                return Ok(IngestReport::default());
            }
            open.timeline.confirmed_len() as u32
        };
        self.fetch(Event::OlderPageRequested { offset }).await
    }

    /// Send a text message.
    ///
    /// Empty (after trimming) content is rejected without touching the
    /// timeline. Otherwise an optimistic message is appended immediately,
    /// then resolved in place once the backend answers.
    ///
    /// # Errors
    ///
    /// Only [`ClientError::NotOpen`]; remote failures are reported through
    /// [`SendOutcome::Failed`].
    pub async fn send(&self, content: &str) -> Result<SendOutcome, ClientError> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Rejected);
        }

        let (local_id, ticket) = {
            let mut inner = self.inner.lock().await;
            let epoch = inner.epoch;
            let open = inner.open.as_mut().ok_or(ClientError::NotOpen)?;
            let Some(session) = self.current_session(open) else {
                warn!(conversation = %open.id, "send without a session");
                return Ok(SendOutcome::Failed(ErrorKind::Auth));
            };

            let local_id = open.timeline.append_optimistic(content, session.user_id);
            let ticket = Ticket {
                epoch,
                conversation_id: open.id.clone(),
                credential: session.credential,
            };
            self.dispatch(&mut inner, Event::SendStarted);
            (local_id, ticket)
        };

        self.deliver(local_id, content, ticket).await
    }

    /// Resend a message whose previous attempt failed.
    ///
    /// The message keeps its position and goes back to pending.
    pub async fn retry_send(&self, local_id: LocalId) -> Result<SendOutcome, ClientError> {
        let (content, ticket) = {
            let mut inner = self.inner.lock().await;
            let epoch = inner.epoch;
            let open = inner.open.as_mut().ok_or(ClientError::NotOpen)?;
            let credential = self
                .current_session(open)
                .map(|s| s.credential)
                .ok_or_else(|| TransportError::Auth("no active session".into()))?;

            let content = open.timeline.retry_failed(local_id)?.content.clone();
            let ticket = Ticket {
                epoch,
                conversation_id: open.id.clone(),
                credential,
            };
            self.dispatch(&mut inner, Event::SendStarted);
            (content, ticket)
        };

        self.deliver(local_id, &content, ticket).await
    }

    /// Remove a failed message from the timeline.
    pub async fn dismiss_failed(&self, local_id: LocalId) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        let open = inner.open.as_mut().ok_or(ClientError::NotOpen)?;
        open.timeline.dismiss_failed(local_id)?;
        debug!(conversation = %open.id, %local_id, "failed message dismissed");
        Ok(())
    }

    /// Close the conversation and release its timeline.
    ///
    /// Responses still in flight are discarded when they arrive. Closing
    /// when nothing is open is a no-op.
    pub async fn close(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        if inner.open.is_none() {
            return Ok(());
        }
        let mutations = inner
            .open
            .as_ref()
            .map(|open| open.timeline.revision())
            .unwrap_or_default();
        self.dispatch(&mut inner, Event::CloseRequested);
        inner.epoch += 1;
        info!(epoch = inner.epoch, mutations, "conversation closed");
        Ok(())
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConversationState {
        self.inner.lock().await.state.clone()
    }

    /// Messages in render order (empty when nothing is open).
    pub async fn messages(&self) -> Vec<Message> {
        let inner = self.inner.lock().await;
        inner
            .open
            .as_ref()
            .map(|open| open.timeline.snapshot())
            .unwrap_or_default()
    }

    /// The open conversation, if any.
    pub async fn conversation_id(&self) -> Option<ConversationId> {
        let inner = self.inner.lock().await;
        inner.open.as_ref().map(|open| open.id.clone())
    }

    /// Total timeline mutations applied through this controller.
    ///
    /// Does not change after close.
    pub async fn mutation_count(&self) -> u64 {
        let inner = self.inner.lock().await;
        inner.retired_mutations
            + inner
                .open
                .as_ref()
                .map(|open| open.timeline.revision())
                .unwrap_or_default()
    }

    /// Whether [`load_older`](Self::load_older) has reached the start of
    /// the conversation.
    pub async fn history_exhausted(&self) -> bool {
        let inner = self.inner.lock().await;
        inner
            .open
            .as_ref()
            .is_some_and(|open| open.history_exhausted)
    }

    /// Mark-read signals handed out and failed in this mount.
    pub async fn read_stats(&self) -> (u64, u64) {
        let inner = self.inner.lock().await;
        inner
            .open
            .as_ref()
            .map(|open| (open.read.fired(), open.read.failures()))
            .unwrap_or_default()
    }

    /// Subscribe to conversation events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The mount's session; a signed-out mount picks up a later sign-in.
    fn current_session(&self, open: &mut OpenConversation) -> Option<Session> {
        if open.session.is_none() {
            open.session = self.sessions.session();
        }
        open.session.clone()
    }

    /// Feed an event to the state machine and execute its actions.
    ///
    /// Returns the offset to fetch if the machine asked for a page.
    fn dispatch(&self, inner: &mut Inner, event: Event) -> Option<u32> {
        let state = std::mem::take(&mut inner.state);
        let (state, actions) = state.on_event(event);
        inner.state = state;

        let mut fetch = None;
        for action in actions {
            match action {
                Action::FetchPage { offset } => fetch = Some(offset),
                Action::ReleaseTimeline => inner.release(),
                Action::Emit(event) => {
                    // No subscribers is fine
                    let _ = self.events.send(event);
                }
            }
        }
        fetch
    }

    /// Run one fetch cycle: request, merge, then mark as read.
    async fn fetch(&self, event: Event) -> Result<IngestReport, ClientError> {
        let limit = self.config.page_size;

        let (ticket, cycle, offset) = {
            let mut inner = self.inner.lock().await;
            let epoch = inner.epoch;
            if inner.open.is_none() {
                return Err(ClientError::NotOpen);
            }
            let state = inner.state.clone();
            let Some(offset) = self.dispatch(&mut inner, event) else {
                return Err(ClientError::InvalidState(format!(
                    "no fetch available in state {:?}",
                    state
                )));
            };

            let open = inner.open.as_mut().ok_or(ClientError::NotOpen)?;
            let Some(session) = self.current_session(open) else {
                warn!(conversation = %open.id, "no session; fetch not sent");
                let kind = ErrorKind::Auth;
                self.dispatch(&mut inner, Event::LoadFailed { kind });
                return Err(TransportError::Auth("no active session".into()).into());
            };

            let cycle = open.read.begin_cycle();
            let ticket = Ticket {
                epoch,
                conversation_id: open.id.clone(),
                credential: session.credential,
            };
            (ticket, cycle, offset)
        };

        let result = self
            .transport
            .fetch_page(&ticket.credential, &ticket.conversation_id, limit, offset)
            .await;

        let (report, fire) = {
            let mut inner = self.inner.lock().await;
            if inner.epoch != ticket.epoch {
                debug!(
                    conversation = %ticket.conversation_id,
                    epoch = ticket.epoch,
                    "late page discarded"
                );
                return Err(ClientError::Discarded);
            }
            let open = inner.open.as_mut().ok_or(ClientError::Discarded)?;

            match result {
                Err(e) => {
                    open.read.abandon(cycle);
                    warn!(conversation = %open.id, offset, error = %e, "fetch failed");
                    self.dispatch(&mut inner, Event::LoadFailed { kind: e.kind() });
                    return Err(e.into());
                }
                Ok(page) => {
                    let page_len = page.len();
                    let report = open.timeline.ingest_page(page);
                    let newest = open.timeline.newest_sent_at();
                    if offset > 0 && page_len < limit as usize {
                        open.history_exhausted = true;
                    }
                    let fire = open.read.page_ingested(cycle, page_len, newest).is_some();
                    let in_flight = open.timeline.pending_count() as u32;

                    info!(
                        conversation = %open.id,
                        offset,
                        count = page_len,
                        added = report.added,
                        duplicates = report.duplicates,
                        rejected = report.rejected,
                        "page merged"
                    );
                    self.dispatch(
                        &mut inner,
                        Event::PageLoaded {
                            messages: page_len,
                            in_flight,
                        },
                    );
                    (report, fire)
                }
            }
        };

        if fire {
            self.mark_read(&ticket).await;
        }
        Ok(report)
    }

    /// Send the mark-read signal. Failures are logged, never surfaced.
    ///
    /// Skipped if the conversation was closed or switched after the merge.
    async fn mark_read(&self, ticket: &Ticket) {
        if self.inner.lock().await.epoch != ticket.epoch {
            debug!(conversation = %ticket.conversation_id, "mark-read skipped after close");
            return;
        }

        let result = self
            .transport
            .mark_read(&ticket.credential, &ticket.conversation_id)
            .await;

        let mut inner = self.inner.lock().await;
        let current = inner.epoch == ticket.epoch;
        if let Err(e) = &result {
            warn!(conversation = %ticket.conversation_id, error = %e, "mark-read failed");
        }
        if let (true, Some(open)) = (current, inner.open.as_mut()) {
            open.read.record_outcome(result.is_ok());
        }
    }

    /// Send (or resend) an optimistic message and resolve it.
    async fn deliver(
        &self,
        local_id: LocalId,
        content: &str,
        ticket: Ticket,
    ) -> Result<SendOutcome, ClientError> {
        let result = self
            .transport
            .send_message(&ticket.credential, &ticket.conversation_id, content)
            .await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != ticket.epoch {
            debug!(
                conversation = %ticket.conversation_id,
                %local_id,
                "late send response discarded"
            );
            return Ok(SendOutcome::Discarded);
        }
        let open = inner.open.as_mut().ok_or(ClientError::Discarded)?;

        let failure = match result {
            Ok(message) => {
                let id = message.id.clone();
                match open
                    .timeline
                    .resolve_optimistic(local_id, Resolution::Confirmed(message))
                {
                    Ok(resolved) => {
                        info!(conversation = %open.id, %local_id, %id, ?resolved, "message confirmed");
                        self.dispatch(&mut inner, Event::SendConfirmed { local_id, id: id.clone() });
                        return Ok(SendOutcome::Confirmed(id));
                    }
                    Err(TimelineError::ConversationMismatch { expected, actual }) => {
                        TransportError::Server {
                            status: 200,
                            body: format!("message stored in {} instead of {}", actual, expected),
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => e,
        };

        let kind = failure.kind();
        open.timeline
            .resolve_optimistic(local_id, Resolution::Failed)?;
        let failed = open.timeline.failed_count();
        warn!(conversation = %open.id, %local_id, %kind, failed, error = %failure, "send failed");
        self.dispatch(&mut inner, Event::SendFailed { local_id, kind });
        Ok(SendOutcome::Failed(kind))
    }
}
