//! Conversation state machine for chatsync.
//!
//! This module provides a pure, side-effect-free state machine for one
//! mount of the conversation screen. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (fetching pages, sending messages) is performed by
//! chat-client, not by this module. This enables instant unit testing
//! without network mocks.

use chat_types::{LocalId, MessageId};

use crate::error::ErrorKind;

/// Lifecycle of one mounted conversation - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// Created, nothing requested yet.
    Idle,
    /// First page requested.
    Loading,
    /// First page merged; list is interactive.
    Ready,
    /// Ready with sends in flight. The list stays interactive.
    Sending {
        /// Number of sends awaiting a response.
        in_flight: u32,
    },
    /// The first page failed to load. Offers a retry.
    Error {
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// Screen unmounted. Terminal.
    Closed,
}

impl ConversationState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (chat-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Close is reachable from every live state
            (Self::Closed, Event::CloseRequested) => (Self::Closed, vec![]),
            (_, Event::CloseRequested) => (
                Self::Closed,
                vec![
                    Action::ReleaseTimeline,
                    Action::Emit(ConversationEvent::Closed),
                ],
            ),
            (Self::Closed, _) => (Self::Closed, vec![]),

            // From Idle
            (Self::Idle, Event::OpenRequested) => {
                (Self::Loading, vec![Action::FetchPage { offset: 0 }])
            }

            // From Loading
            (
                Self::Loading,
                Event::PageLoaded {
                    messages,
                    in_flight,
                },
            ) => (
                Self::settled(in_flight),
                vec![Action::Emit(ConversationEvent::Loaded { messages })],
            ),
            (Self::Loading, Event::LoadFailed { kind }) => (
                Self::Error { kind },
                vec![Action::Emit(ConversationEvent::LoadFailed { kind })],
            ),

            // From Error
            (Self::Error { .. }, Event::RetryRequested) => {
                (Self::Loading, vec![Action::FetchPage { offset: 0 }])
            }

            // Follow-up fetches once the first page is in
            (state @ (Self::Ready | Self::Sending { .. }), Event::RefreshRequested) => {
                (state, vec![Action::FetchPage { offset: 0 }])
            }
            (state @ (Self::Ready | Self::Sending { .. }), Event::OlderPageRequested { offset }) => {
                (state, vec![Action::FetchPage { offset }])
            }
            (state @ (Self::Ready | Self::Sending { .. }), Event::PageLoaded { messages, .. }) => (
                state,
                vec![Action::Emit(ConversationEvent::Loaded { messages })],
            ),
            (state @ (Self::Ready | Self::Sending { .. }), Event::LoadFailed { kind }) => (
                state,
                vec![Action::Emit(ConversationEvent::RefreshFailed { kind })],
            ),

            // Sends
            (Self::Ready, Event::SendStarted) => (Self::Sending { in_flight: 1 }, vec![]),
            (Self::Sending { in_flight }, Event::SendStarted) => (
                Self::Sending {
                    in_flight: in_flight.saturating_add(1),
                },
                vec![],
            ),
            (state, Event::SendConfirmed { local_id, id }) => (
                state.send_settled(),
                vec![Action::Emit(ConversationEvent::MessageConfirmed { local_id, id })],
            ),
            (state, Event::SendFailed { local_id, kind }) => (
                state.send_settled(),
                vec![Action::Emit(ConversationEvent::SendFailed { local_id, kind })],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// State after the first page, given the sends still in flight.
    fn settled(in_flight: u32) -> Self {
        if in_flight == 0 {
            Self::Ready
        } else {
            Self::Sending { in_flight }
        }
    }

    /// State after one send completed.
    ///
    /// Sends started before the first page loaded are accounted for by
    /// [`Event::PageLoaded`], so only `Sending` counts down here.
    fn send_settled(self) -> Self {
        match self {
            Self::Sending { in_flight } => Self::settled(in_flight.saturating_sub(1)),
            other => other,
        }
    }

    /// Check if the first page has been merged and the list is interactive.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready | Self::Sending { .. })
    }

    /// Check if the state machine has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur during a conversation mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The screen mounted for this conversation.
    OpenRequested,
    /// A fetched page was merged into the timeline.
    PageLoaded {
        /// Number of messages in the page.
        messages: usize,
        /// Sends still awaiting a response.
        in_flight: u32,
    },
    /// A fetch failed.
    LoadFailed {
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// The user asked to retry a failed first load.
    RetryRequested,
    /// Poll for newly arrived messages.
    RefreshRequested,
    /// The user scrolled to the top of the loaded history.
    OlderPageRequested {
        /// Offset of the page to fetch.
        offset: u32,
    },
    /// An optimistic message was appended and its send started.
    SendStarted,
    /// A send was acknowledged.
    SendConfirmed {
        /// The optimistic message.
        local_id: LocalId,
        /// Server id it resolved to.
        id: MessageId,
    },
    /// A send errored.
    SendFailed {
        /// The optimistic message.
        local_id: LocalId,
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// The screen unmounted.
    CloseRequested,
}

/// Actions to be executed by the chat-client.
///
/// These are instructions, not side effects. The chat-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Fetch a page of messages.
    FetchPage {
        /// Number of newest messages to skip.
        offset: u32,
    },
    /// Drop the timeline; later responses must not touch it.
    ReleaseTimeline,
    /// Notify the presentation layer.
    Emit(ConversationEvent),
}

/// Events emitted to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A page was merged into the timeline.
    Loaded {
        /// Number of messages in the page.
        messages: usize,
    },
    /// The first page failed to load.
    LoadFailed {
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// A refresh or older-page fetch failed; the list is unchanged.
    RefreshFailed {
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// An optimistic message was confirmed.
    MessageConfirmed {
        /// The optimistic message.
        local_id: LocalId,
        /// Server id it resolved to.
        id: MessageId,
    },
    /// An optimistic message failed to send. Non-blocking.
    SendFailed {
        /// The optimistic message.
        local_id: LocalId,
        /// Classification of the failure.
        kind: ErrorKind,
    },
    /// The conversation was closed.
    Closed,
}
