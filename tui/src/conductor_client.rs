//! Conductor Client
//!
//! Thin wrapper around an embedded Conductor. The TUI converts key presses
//! into [`SurfaceEvent`]s here and drains [`ConductorMessage`]s every frame;
//! it holds no conversation logic of its own.

use std::path::PathBuf;

use tokio::sync::mpsc;

use streamchat_core::{
    ChatConfig, Conductor, ConductorMessage, ConductorState, OpenAiBackend, SurfaceEvent,
};

/// Capacity of the Conductor -> TUI channel
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Client for communicating with the embedded Conductor
pub struct ConductorClient {
    conductor: Conductor<OpenAiBackend>,
    rx: mpsc::Receiver<ConductorMessage>,
}

impl ConductorClient {
    /// Build the backend and Conductor from configuration
    pub fn new(config: ChatConfig) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let backend = OpenAiBackend::from_config(&config)?;
        let conductor = Conductor::new(backend, config, tx);

        Ok(Self { conductor, rx })
    }

    /// Start the Conductor
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.conductor.start().await
    }

    /// Submit a user message
    pub async fn send_message(&mut self, content: String) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::UserMessage { content })
            .await
    }

    /// Switch to the next configured model
    pub async fn cycle_model(&mut self) -> anyhow::Result<()> {
        self.conductor.handle_event(SurfaceEvent::CycleModel).await
    }

    /// Switch to the next scenario
    pub async fn cycle_scenario(&mut self) -> anyhow::Result<()> {
        self.conductor.handle_event(SurfaceEvent::CycleScenario).await
    }

    /// Turn continuation mode on or off
    pub async fn set_continuation(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::SetContinuation { enabled })
            .await
    }

    /// Choose the directory turns are saved to
    pub async fn set_log_dir(&mut self, path: PathBuf) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::SetLogDir { path })
            .await
    }

    /// Notify Conductor that user wants to quit
    pub async fn request_quit(&mut self) -> anyhow::Result<()> {
        self.conductor.handle_event(SurfaceEvent::QuitRequested).await
    }

    /// Poll for streaming tokens (must be called regularly)
    pub async fn poll_streaming(&mut self) -> bool {
        self.conductor.poll_streaming().await
    }

    /// Receive all pending messages from Conductor (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Get current Conductor state
    pub fn state(&self) -> ConductorState {
        self.conductor.state()
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.conductor.is_busy()
    }
}
