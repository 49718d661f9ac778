//! streamchat core - headless streaming chat engine
//!
//! This crate holds everything between the user pressing Enter and styled
//! text appearing on screen, independent of any UI framework:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          UI Surface                              │
//! │        SurfaceEvent (up)             ConductorMessage (down)     │
//! └───────────────┬──────────────────────────────▲───────────────────┘
//!                 │                              │ Segment / BoldRanges
//! ┌───────────────▼──────────────────────────────┴───────────────────┐
//! │                          Conductor                               │
//! │  composer ──► backend ──► streaming::delta_stream                │
//! │                               │ deltas                           │
//! │                               ▼                                  │
//! │                     markdown::MarkdownTagger                     │
//! │                               │ tagged spans                     │
//! │                               ▼                                  │
//! │              session::ConversationAccumulator ──► chat_log       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use streamchat_core::{load_config, Conductor, OpenAiBackend, SurfaceEvent};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = OpenAiBackend::from_config(&config)?;
//!     let (tx, mut rx) = mpsc::channel(256);
//!     let mut conductor = Conductor::new(backend, config, tx);
//!
//!     conductor.start().await?;
//!     conductor.handle_event(SurfaceEvent::user_message("Hello!")).await?;
//!     conductor.wait_for_turn().await;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Render message
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`streaming`]: Server-sent event decoding into text deltas
//! - [`markdown`]: Incremental code-fence and bold tagging
//! - [`session`]: The conversation transcript
//! - [`composer`]: Outbound request construction, continuation mode
//! - [`backend`]: Completion service abstraction and the OpenAI-compatible client
//! - [`conductor`]: Main Conductor struct
//! - [`chat_log`]: Daily markdown chat logs
//! - [`config`]: TOML, environment and CLI configuration
//! - [`events`] / [`messages`]: The surface protocol
//! - [`error`]: Error taxonomy
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod chat_log;
pub mod composer;
pub mod conductor;
pub mod config;
pub mod error;
pub mod events;
pub mod markdown;
pub mod messages;
pub mod session;
pub mod streaming;

// Re-exports for convenience
pub use backend::{LlmBackend, LlmRequest, OpenAiBackend, StreamingToken};
pub use chat_log::{MarkdownChatLog, TurnSink};
pub use composer::{compose, history_preamble, OutboundRequest};
pub use conductor::Conductor;
pub use error::ChatError;
pub use events::SurfaceEvent;
pub use markdown::{MarkdownTagger, SpanKind, TaggedSpan};
pub use messages::{ConductorMessage, ConductorState, DisplayTag};
pub use session::{ConversationAccumulator, Turn, TurnHandle, TurnId, TurnStatus};
pub use streaming::{delta_stream, SseDecoder, SseRecord};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ChatConfig, ConfigError,
    ConfigOverrides, ConfigSource, ScenarioCatalog,
};
