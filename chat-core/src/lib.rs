//! # chat-core
//!
//! Pure logic for chatsync (no I/O, instant tests).
//!
//! This crate implements the timeline, read-state and conversation
//! lifecycle logic without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about ordering and state transitions
//!
//! The actual I/O (HTTP calls to the chat backend) is performed by
//! `chat-client`, which interprets the actions produced by these modules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod read_state;
pub mod state;
pub mod timeline;

pub use error::{ErrorKind, Recovery, TimelineError};
pub use read_state::{FetchCycle, MarkRead, ReadTracker};
pub use state::{Action, ConversationEvent, ConversationState, Event};
pub use timeline::{IngestReport, Resolution, Resolved, Timeline};
