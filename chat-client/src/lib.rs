//! # chat-client
//!
//! Client library for chatsync conversation synchronization.
//!
//! This is the library a chat screen uses to show and extend one
//! conversation.
//!
//! ## Features
//!
//! - **Optimistic Sends**: messages appear immediately and resolve in place
//! - **Idempotent Paging**: re-fetched messages never duplicate
//! - **Transport Abstraction**: Pluggable transport layer (HTTP, mock)
//! - **Pure State Machine**: Uses chat-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use chat_client::{ClientConfig, ConversationController, HttpTransport, StaticSession};
//!
//! let config = ClientConfig::default();
//! let transport = HttpTransport::new(config.clone())?;
//! let controller = ConversationController::new(transport, sessions, config);
//!
//! controller.open(ConversationId::new("42")).await?;
//! controller.send("hello").await?;
//! let messages = controller.messages().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError, EndpointConfig};
pub use controller::{ClientError, ConversationController, SendOutcome};
pub use session::{Credential, Session, SessionAccessor, StaticSession};
pub use transport::{
    Call, ConversationTransport, DeferredReply, HttpTransport, MockTransport, TransportError,
};
