//! # chatsync
//!
//! CLI tool for browsing and sending chatsync conversations.
//!
//! ## Commands
//!
//! - `show`: Open a conversation and print its messages
//! - `send`: Send a text message
//! - `watch`: Poll a conversation for new messages
//!
//! ## Example
//!
//! ```bash
//! export CHATSYNC_TOKEN=...
//! export CHATSYNC_USER=42
//!
//! # Print the newest page plus two older ones
//! chatsync --base-url https://chat.example.com show 17 --older 2
//!
//! # Send a message
//! chatsync send 17 "on my way"
//!
//! # Poll every 5 seconds, 12 times
//! chatsync watch 17 --interval 5 --rounds 12
//!
//! # Offline demo against the in-memory transport
//! chatsync --mock show 17
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat_client::{ConversationController, ConversationTransport, HttpTransport, StaticSession};
use chat_types::ConversationId;

mod commands;
mod config;

use commands::{send, show, watch};
use config::Settings;

/// CLI tool for browsing and sending chatsync conversations.
#[derive(Parser, Debug)]
#[command(name = "chatsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML client configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chat backend base URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the chat backend
    #[arg(long, global = true, env = "CHATSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Id of the signed-in user
    #[arg(long, global = true, env = "CHATSYNC_USER")]
    user: Option<String>,

    /// Use mock transport instead of the HTTP backend (for testing/demo)
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a conversation and print its messages
    Show {
        /// Conversation id
        chat_id: String,

        /// Number of older pages to load after the newest one
        #[arg(long, default_value = "0")]
        older: u32,
    },

    /// Send a text message
    Send {
        /// Conversation id
        chat_id: String,

        /// Message text
        text: String,
    },

    /// Poll a conversation and print messages as they arrive
    Watch {
        /// Conversation id
        chat_id: String,

        /// Seconds between polls
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Number of polls before exiting
        #[arg(long, default_value = "12")]
        rounds: u32,
    },
}

impl Commands {
    fn chat_id(&self) -> ConversationId {
        match self {
            Self::Show { chat_id, .. } | Self::Send { chat_id, .. } | Self::Watch { chat_id, .. } => {
                ConversationId::new(chat_id.as_str())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::resolve(
        cli.config.as_deref(),
        cli.base_url.as_deref(),
        cli.token,
        cli.user,
        cli.mock,
    )?;
    let sessions = StaticSession::new(settings.session.clone());

    if cli.mock {
        let transport = commands::demo_transport(&cli.command.chat_id(), &settings.session.user_id);
        let controller = ConversationController::new(transport, sessions, settings.client.clone());
        run(controller, &settings, cli.command).await
    } else {
        let transport = HttpTransport::new(settings.client.clone())
            .context("Failed to create HTTP transport")?;
        let controller = ConversationController::new(transport, sessions, settings.client.clone());
        run(controller, &settings, cli.command).await
    }
}

async fn run<T: ConversationTransport>(
    controller: ConversationController<T, StaticSession>,
    settings: &Settings,
    command: Commands,
) -> Result<()> {
    let chat_id = command.chat_id();
    let me = &settings.session.user_id;

    match command {
        Commands::Show { older, .. } => show::run(&controller, chat_id, me, older).await,
        Commands::Send { text, .. } => send::run(&controller, chat_id, &text).await,
        Commands::Watch {
            interval, rounds, ..
        } => watch::run(&controller, chat_id, me, interval, rounds).await,
    }
}

/// Initialize tracing to stderr; `RUST_LOG` overrides the default level.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
