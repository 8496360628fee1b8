//! Conversation timeline for chatsync.
//!
//! This module provides the in-memory message list for one conversation with:
//! - Idempotent merging of fetched pages (each id appears once)
//! - Optimistic entries for messages being sent
//! - In-place reconciliation of optimistic entries with confirmed ones
//!
//! Render order is two-tier: confirmed messages sorted by `sent_at`
//! ascending, followed by pending and failed messages in creation order. A
//! message the user just sent therefore never jumps above messages that
//! arrived from the network while it was in flight.
//!
//! A confirmation replaces its optimistic entry where it stands. The entry
//! joins the confirmed tier when the next page adds messages, so later
//! replies render after it.

use std::collections::HashSet;

use chat_types::{ConversationId, LocalId, Message, MessageId, MessageStatus, UserId};
use chrono::{DateTime, Utc};

use crate::error::TimelineError;

/// Outcome of a send, used to resolve an optimistic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The backend stored the message and returned it.
    Confirmed(Message),
    /// The send attempt errored.
    Failed,
}

/// What resolving an optimistic entry did to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// The entry was replaced (or marked failed) at this render index.
    InPlace {
        /// Render index of the entry.
        index: usize,
    },
    /// The confirmed id was already present from a fetch; the optimistic
    /// entry was dropped instead of duplicating it.
    Deduplicated,
}

/// Result of merging one fetched page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Messages added to the timeline.
    pub added: usize,
    /// Messages skipped because their id was already present.
    pub duplicates: usize,
    /// Messages skipped because they were not confirmed messages of this
    /// conversation.
    pub rejected: usize,
}

/// Ordered, de-duplicated messages of one conversation.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Conversation this timeline belongs to.
    conversation_id: ConversationId,
    /// Confirmed messages, sorted by `sent_at` ascending.
    confirmed: Vec<Message>,
    /// Messages created on this device, in creation order. Holds confirmed
    /// entries only until the next page is merged.
    local: Vec<Message>,
    /// Every id currently in either tier.
    ids: HashSet<MessageId>,
    /// Incremented on every applied mutation.
    revision: u64,
}

impl Timeline {
    /// Create an empty timeline for a conversation.
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            confirmed: Vec::new(),
            local: Vec::new(),
            ids: HashSet::new(),
            revision: 0,
        }
    }

    /// The conversation this timeline belongs to.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Merge a fetched page.
    ///
    /// The backend delivers pages newest-first; they are merged oldest-first
    /// so messages sharing a timestamp keep their chronological order.
    /// Messages whose id is already present are skipped, which makes
    /// re-fetching the same page a no-op.
    pub fn ingest_page(&mut self, page: Vec<Message>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut fresh = Vec::new();

        for message in page.into_iter().rev() {
            let Some(sent_at) = message.sent_at else {
                report.rejected += 1;
                continue;
            };
            if message.status != MessageStatus::Confirmed
                || message.id.is_local()
                || message.conversation_id != self.conversation_id
            {
                report.rejected += 1;
                continue;
            }
            if !self.ids.insert(message.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            fresh.push((sent_at, message));
        }

        if fresh.is_empty() {
            return report;
        }

        self.promote_confirmed();
        for (sent_at, message) in fresh {
            // Newer messages land at the end; older pages are inserted
            // before the first later message.
            let position = self
                .confirmed
                .partition_point(|m| m.sent_at.is_some_and(|t| t <= sent_at));
            self.confirmed.insert(position, message);
            report.added += 1;
        }

        self.revision += 1;
        report
    }

    /// Append an optimistic message after the current tail.
    ///
    /// Returns the temporary id to resolve it with once the send completes.
    pub fn append_optimistic(&mut self, content: impl Into<String>, sender_id: UserId) -> LocalId {
        let local_id = LocalId::new();
        let message = Message::optimistic(local_id, self.conversation_id.clone(), sender_id, content);

        self.ids.insert(message.id.clone());
        self.local.push(message);
        self.revision += 1;
        local_id
    }

    /// Resolve a pending optimistic message.
    ///
    /// On success the entry is replaced in place by the confirmed message,
    /// without re-sorting by its `sent_at`. On failure it is marked
    /// [`MessageStatus::Failed`] and keeps its position.
    pub fn resolve_optimistic(
        &mut self,
        local_id: LocalId,
        outcome: Resolution,
    ) -> Result<Resolved, TimelineError> {
        let slot = self.local_slot(local_id)?;
        if !self.local[slot].is_pending() {
            return Err(TimelineError::NotPending(local_id));
        }

        let resolved = match outcome {
            Resolution::Failed => {
                self.local[slot].status = MessageStatus::Failed;
                Resolved::InPlace {
                    index: self.confirmed.len() + slot,
                }
            }
            Resolution::Confirmed(mut message) => {
                if message.conversation_id != self.conversation_id {
                    return Err(TimelineError::ConversationMismatch {
                        expected: self.conversation_id.clone(),
                        actual: message.conversation_id,
                    });
                }
                message.status = MessageStatus::Confirmed;

                let local_key = MessageId::Local(local_id);
                self.ids.remove(&local_key);
                if self.ids.contains(&message.id) {
                    self.local.remove(slot);
                    Resolved::Deduplicated
                } else {
                    self.ids.insert(message.id.clone());
                    self.local[slot] = message;
                    Resolved::InPlace {
                        index: self.confirmed.len() + slot,
                    }
                }
            }
        };

        self.revision += 1;
        Ok(resolved)
    }

    /// Put a failed message back into the pending state for a resend.
    pub fn retry_failed(&mut self, local_id: LocalId) -> Result<&Message, TimelineError> {
        let slot = self.local_slot(local_id)?;
        if !self.local[slot].is_failed() {
            return Err(TimelineError::NotFailed(local_id));
        }
        self.local[slot].status = MessageStatus::Pending;
        self.revision += 1;
        Ok(&self.local[slot])
    }

    /// Remove a failed message the user chose to dismiss.
    pub fn dismiss_failed(&mut self, local_id: LocalId) -> Result<Message, TimelineError> {
        let slot = self.local_slot(local_id)?;
        if !self.local[slot].is_failed() {
            return Err(TimelineError::NotFailed(local_id));
        }
        let message = self.local.remove(slot);
        self.ids.remove(&message.id);
        self.revision += 1;
        Ok(message)
    }

    /// Messages in render order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.confirmed.iter().chain(self.local.iter())
    }

    /// Owned copy of the messages in render order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages().cloned().collect()
    }

    /// Find a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages().find(|m| &m.id == id)
    }

    /// Render index of a message.
    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages().position(|m| &m.id == id)
    }

    /// Check if a message id is present.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Total number of messages.
    pub fn len(&self) -> usize {
        self.confirmed.len() + self.local.len()
    }

    /// Check if the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.local.is_empty()
    }

    /// Number of confirmed messages, fetched or sent from here.
    ///
    /// This is the offset of the next older page.
    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len() + self.local.iter().filter(|m| m.is_confirmed()).count()
    }

    /// Number of messages still awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.local.iter().filter(|m| m.is_pending()).count()
    }

    /// Number of messages whose send failed.
    pub fn failed_count(&self) -> usize {
        self.local.iter().filter(|m| m.is_failed()).count()
    }

    /// Timestamp of the newest confirmed message.
    pub fn newest_sent_at(&self) -> Option<DateTime<Utc>> {
        self.messages().filter_map(|m| m.sent_at).max()
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Move confirmed entries of the local tier to the end of the confirmed
    /// tier, keeping their relative order.
    fn promote_confirmed(&mut self) {
        let (confirmed, unresolved): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.local).into_iter().partition(|m| m.is_confirmed());
        self.confirmed.extend(confirmed);
        self.local = unresolved;
    }

    fn local_slot(&self, local_id: LocalId) -> Result<usize, TimelineError> {
        let key = MessageId::Local(local_id);
        self.local
            .iter()
            .position(|m| m.id == key)
            .ok_or(TimelineError::UnknownLocalId(local_id))
    }
}
