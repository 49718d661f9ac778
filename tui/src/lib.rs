//! streamchat TUI - terminal surface for the streaming chat core
//!
//! A full-screen conversation view over an embedded
//! [`Conductor`](streamchat_core::Conductor).
//!
//! # Architecture
//!
//! - **App**: Event loop, key bindings and layout
//! - **ConductorClient**: Events up, messages down
//! - **Display**: State rebuilt from Conductor messages
//! - **Widgets**: Borderless scrollable text blocks
//! - **Theme**: One style per display tag

pub mod app;
pub mod conductor_client;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::App;
