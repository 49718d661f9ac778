//! Conductor - The Orchestration Core
//!
//! The Conductor wires the pipeline together for one conversation:
//!
//! ```text
//! SurfaceEvent::UserMessage
//!     -> compose (history preamble in continuation mode)
//!     -> begin_turn
//!     -> backend.send_streaming  (SSE decoded on the backend's task)
//!     -> per delta: tagger.ingest -> transcript.append -> Segment / BoldRanges
//!     -> on Complete / Error: end_turn or fail_turn -> chat log -> notices
//! ```
//!
//! It is UI-agnostic: surfaces send [`SurfaceEvent`]s and render the
//! [`ConductorMessage`]s they get back. All conversation state lives here and
//! is only touched from the task that owns the Conductor.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::backend::{LlmBackend, LlmRequest, StreamingToken};
use crate::chat_log::{MarkdownChatLog, TurnSink};
use crate::composer::compose;
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::events::SurfaceEvent;
use crate::markdown::MarkdownTagger;
use crate::messages::{ConductorMessage, ConductorState, DisplayTag};
use crate::session::{ConversationAccumulator, Turn, TurnHandle, TurnId};

/// Upper bound on tokens handled by one [`Conductor::poll_streaming`] call
const MAX_TOKENS_PER_POLL: usize = 16;

/// Milliseconds since `started`, saturating
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// The request currently streaming
struct ActiveStream {
    handle: TurnHandle,
    rx: mpsc::Receiver<StreamingToken>,
    started: Instant,
    delta_count: u32,
}

/// The Conductor - headless orchestration core
pub struct Conductor<B: LlmBackend> {
    /// Selections and request settings
    config: ChatConfig,
    /// LLM backend
    backend: Arc<B>,
    /// The conversation so far
    transcript: ConversationAccumulator,
    /// Fence/bold state for the response being streamed
    tagger: MarkdownTagger,
    /// Where finished turns are written
    sink: Option<Box<dyn TurnSink>>,
    /// Current operational state
    state: ConductorState,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
    /// In-flight request, if any
    active: Option<ActiveStream>,
    /// Messages the surface channel had no room for yet
    outbox: VecDeque<ConductorMessage>,
}

impl<B: LlmBackend + 'static> Conductor<B> {
    /// Create a new Conductor with the given backend.
    ///
    /// Turns are logged to `config.log_dir` when one is set.
    pub fn new(backend: B, config: ChatConfig, tx: mpsc::Sender<ConductorMessage>) -> Self {
        let sink = config
            .log_dir
            .as_ref()
            .map(|dir| Box::new(MarkdownChatLog::new(dir.clone())) as Box<dyn TurnSink>);

        Self {
            config,
            backend: Arc::new(backend),
            transcript: ConversationAccumulator::new(),
            tagger: MarkdownTagger::new(),
            sink,
            state: ConductorState::Initializing,
            tx,
            active: None,
            outbox: VecDeque::new(),
        }
    }

    /// Replace the chat log destination
    #[must_use]
    pub fn with_sink(mut self, sink: impl TurnSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Get current state
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Current configuration and selections
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The conversation so far
    pub fn transcript(&self) -> &ConversationAccumulator {
        &self.transcript
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.transcript.is_busy()
    }

    /// Start the Conductor
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.set_state(ConductorState::Initializing);

        if !self.backend.health_check().await {
            tracing::warn!(backend = self.backend.name(), "Backend health check failed");
            self.notice("[Endpoint not reachable yet; the first request may fail]\n");
        }
        if self.config.api_key.is_none() {
            self.notice("[No API key configured; set STREAMCHAT_API_KEY or [api].api_key]\n");
        }

        self.set_state(ConductorState::Ready);
        self.send_session_info();
        Ok(())
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        self.flush_outbox();
        match event {
            SurfaceEvent::UserMessage { content } => match self.submit(&content).await {
                Ok(_) => {}
                Err(e) if e.is_precondition() => self.reject(&e.to_string()),
                Err(e) => return Err(e.into()),
            },

            SurfaceEvent::SelectModel { model } => self.select_model(model),

            SurfaceEvent::SelectScenario { scenario } => self.select_scenario(scenario),

            SurfaceEvent::CycleModel => {
                if let Some(next) = self.config.next_model().map(str::to_string) {
                    self.select_model(next);
                }
            }

            SurfaceEvent::CycleScenario => {
                if let Some(next) = self.config.next_scenario().map(str::to_string) {
                    self.select_scenario(next);
                }
            }

            SurfaceEvent::SetContinuation { enabled } => {
                self.config.continuation = enabled;
                tracing::info!(enabled, "Continuation mode changed");
                self.send_session_info();
            }

            SurfaceEvent::SetLogDir { path } => {
                if path.is_dir() {
                    self.notice(&format!("[Chat logs will be saved in {}]\n", path.display()));
                    self.config.log_dir = Some(path.clone());
                    self.sink = Some(Box::new(MarkdownChatLog::new(path)));
                    self.send_session_info();
                } else {
                    self.reject(&format!("{} is not a directory", path.display()));
                }
            }

            SurfaceEvent::QuitRequested => {
                self.shutdown().await?;
            }
        }

        Ok(())
    }

    /// Submit a user message.
    ///
    /// On success the turn exists and its request has been issued (or has
    /// already failed and been finalized). The response is delivered by
    /// [`Self::poll_streaming`] or [`Self::wait_for_turn`].
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] or [`ChatError::State`] when the message
    /// cannot be sent. No turn is created and nothing is sent to the surface.
    pub async fn submit(&mut self, user_text: &str) -> Result<TurnId, ChatError> {
        let text = user_text.trim();
        self.check_preconditions()?;

        let request = compose(
            text,
            &self.config.scenario,
            &self.config.model,
            self.config.continuation,
            &self.transcript,
            &self.config.scenarios,
        )?;
        let handle =
            self.transcript
                .begin_turn(text, self.config.model.clone(), self.config.scenario.clone())?;
        let turn_id = handle.id();
        self.tagger.reset();

        self.send(ConductorMessage::TurnStarted { turn_id });
        self.echo_user(turn_id, text);
        if let Some(chars) = request.history_chars {
            self.notice(&format!(
                "[Continuation mode: prepended {chars} characters of history]\n"
            ));
        }
        self.send_segment(Some(turn_id), "\n--- Assistant ---\n", DisplayTag::SystemNotice);
        self.set_state(ConductorState::Thinking);

        match self.backend.send_streaming(&LlmRequest::from(&request)).await {
            Ok(rx) => {
                self.active = Some(ActiveStream {
                    handle,
                    rx,
                    started: Instant::now(),
                    delta_count: 0,
                });
            }
            Err(e) => {
                tracing::warn!(turn = %turn_id, error = %e, "Request failed");
                self.finish_turn(&handle, Err(e.to_string()));
            }
        }

        Ok(turn_id)
    }

    /// Poll for streaming tokens
    ///
    /// Call this regularly to process incoming tokens.
    /// Returns true if there was activity.
    ///
    /// Queued surface messages are delivered first. While any remain, no
    /// new tokens are read, so a slow surface holds back the backend rather
    /// than growing the queue.
    pub async fn poll_streaming(&mut self) -> bool {
        let flushed = self.flush_outbox();
        if !self.outbox.is_empty() {
            return flushed;
        }

        let tokens: Vec<StreamingToken> = {
            let Some(active) = self.active.as_mut() else {
                return flushed;
            };

            let mut collected = Vec::new();
            while collected.len() < MAX_TOKENS_PER_POLL {
                match active.rx.try_recv() {
                    Ok(token) => {
                        let is_terminal = matches!(
                            token,
                            StreamingToken::Complete { .. } | StreamingToken::Error(_)
                        );
                        collected.push(token);
                        if is_terminal {
                            break;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        collected.push(StreamingToken::Error(
                            "response stream closed unexpectedly".to_string(),
                        ));
                        break;
                    }
                }
            }
            collected
        };

        if tokens.is_empty() {
            return flushed;
        }
        for token in tokens {
            self.process_token(token);
        }
        true
    }

    /// Process tokens until the in-flight turn (if any) is finished.
    ///
    /// Messages beyond the surface channel's capacity stay queued (see
    /// [`Self::pending_messages`]) and go out on later polls or events.
    pub async fn wait_for_turn(&mut self) {
        loop {
            let token = match self.active.as_mut() {
                Some(active) => active.rx.recv().await.unwrap_or_else(|| {
                    StreamingToken::Error("response stream closed unexpectedly".to_string())
                }),
                None => break,
            };
            self.process_token(token);
        }
        self.flush_outbox();
    }

    /// Shut down
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.set_state(ConductorState::ShuttingDown);
        tracing::info!(turns = self.transcript.len(), "Conductor shutting down");

        self.send(ConductorMessage::Quit {
            message: Some("Goodbye!".to_string()),
        });

        Ok(())
    }

    fn check_preconditions(&self) -> Result<(), ChatError> {
        if self.config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ChatError::Config("no API key configured".to_string()));
        }
        if !self.config.has_model(&self.config.model) {
            return Err(ChatError::Config(format!(
                "model '{}' is not available",
                self.config.model
            )));
        }
        match self.sink {
            None => Err(ChatError::Config(
                "no chat log directory configured; set [chat].log_dir or STREAMCHAT_LOG_DIR"
                    .to_string(),
            )),
            Some(ref sink) if !sink.is_ready() => Err(ChatError::Config(format!(
                "chat log directory {} is not available",
                sink.describe()
            ))),
            Some(_) => Ok(()),
        }
    }

    fn process_token(&mut self, token: StreamingToken) {
        let Some(handle) = self.active.as_ref().map(|a| a.handle.clone()) else {
            return;
        };
        let turn_id = handle.id();

        match token {
            StreamingToken::Token(text) => {
                if self.state != ConductorState::Responding {
                    self.set_state(ConductorState::Responding);
                }
                if let Some(active) = self.active.as_mut() {
                    active.delta_count += 1;
                }

                let outcome = self.tagger.ingest(&text);
                if let Err(e) = self.transcript.append_assistant_spans(&handle, &outcome.spans) {
                    tracing::warn!(turn = %turn_id, error = %e, "Dropping delta");
                    return;
                }
                for span in outcome.spans {
                    self.send_segment(Some(turn_id), span.text, span.kind.into());
                }
                if outcome.bold_rescanned {
                    self.send(ConductorMessage::BoldRanges {
                        turn_id,
                        ranges: self.tagger.bold_ranges().to_vec(),
                    });
                }
            }

            StreamingToken::Complete { message } => {
                if message != self.tagger.buffer() {
                    tracing::debug!(
                        turn = %turn_id,
                        backend_chars = message.len(),
                        received_chars = self.tagger.buffer().len(),
                        "Backend summary differs from received deltas"
                    );
                }
                self.finish_turn(&handle, Ok(()));
            }

            StreamingToken::Error(error) => {
                self.finish_turn(&handle, Err(error));
            }
        }
    }

    /// Close the turn, persist it once, and tell the surface
    fn finish_turn(&mut self, handle: &TurnHandle, outcome: Result<(), String>) {
        let turn_id = handle.id();
        if let Some(active) = self.active.take() {
            tracing::info!(
                turn = %turn_id,
                deltas = active.delta_count,
                elapsed_ms = elapsed_ms(active.started),
                "Stream finished"
            );
        }

        let closed = match &outcome {
            Ok(()) => self.transcript.end_turn(handle),
            Err(error) => self.transcript.fail_turn(handle, error.clone()),
        };
        let turn = match closed {
            Ok(turn) => turn.clone(),
            Err(e) => {
                tracing::warn!(turn = %turn_id, error = %e, "Could not close turn");
                self.set_state(ConductorState::Ready);
                return;
            }
        };

        let success = outcome.is_ok();
        match outcome {
            Ok(()) => self.notice("\n[Conversation ended]\n"),
            Err(error) => {
                self.send_segment(
                    Some(turn_id),
                    format!("\n[API error: {error}]\n"),
                    DisplayTag::Error,
                );
            }
        }

        self.persist(&turn);
        self.send(ConductorMessage::TurnFinished { turn_id, success });
        self.set_state(ConductorState::Ready);
    }

    fn persist(&mut self, turn: &Turn) {
        let Some(sink) = self.sink.as_mut() else {
            tracing::warn!(turn = %turn.id, "No chat log configured, turn not saved");
            return;
        };

        match sink.persist(turn) {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                self.notice(&format!("[Saved to {name}]\n"));
            }
            Err(e) => {
                tracing::warn!(turn = %turn.id, error = %e, "Failed to save turn");
                self.notice(&format!("[Could not save chat log: {e}]\n"));
            }
        }
    }

    fn select_model(&mut self, model: String) {
        if !self.config.has_model(&model) {
            self.reject(&format!("model '{model}' is not available"));
            return;
        }
        tracing::info!(model = %model, "Model selected");
        self.config.model = model;
        self.send_session_info();
    }

    fn select_scenario(&mut self, scenario: String) {
        if !self.config.scenarios.contains(&scenario) {
            self.reject(&format!("unknown scenario '{scenario}'"));
            return;
        }
        tracing::info!(scenario = %scenario, "Scenario selected");
        self.config.scenario = scenario;
        self.send_session_info();
    }

    fn echo_user(&mut self, turn_id: TurnId, text: &str) {
        let header = format!(
            "\n[{}] You ({} | {}):\n",
            chrono::Local::now().format("%H:%M:%S"),
            self.config.model,
            self.config.scenario
        );
        self.send_segment(Some(turn_id), header, DisplayTag::User);
        self.send_segment(Some(turn_id), format!("{text}\n"), DisplayTag::User);
    }

    fn send_session_info(&mut self) {
        self.send(ConductorMessage::SessionInfo {
            model: self.config.model.clone(),
            scenario: self.config.scenario.clone(),
            continuation: self.config.continuation,
            log_destination: self.sink.as_ref().map(|s| s.describe()),
        });
    }

    fn reject(&mut self, reason: &str) {
        tracing::info!(reason, "Submission rejected");
        self.send(ConductorMessage::Rejected {
            reason: reason.to_string(),
        });
    }

    fn notice(&mut self, text: &str) {
        self.send_segment(None, text, DisplayTag::SystemNotice);
    }

    fn send_segment(&mut self, turn_id: Option<TurnId>, text: impl Into<String>, tag: DisplayTag) {
        self.send(ConductorMessage::Segment {
            turn_id,
            text: text.into(),
            tag,
        });
    }

    /// Set state and notify UI
    fn set_state(&mut self, state: ConductorState) {
        self.state = state;
        self.send(ConductorMessage::State { state });
    }

    /// Queue a message for the UI surface.
    ///
    /// Never waits: the surface drains the channel on the same task that
    /// drives the Conductor. What does not fit stays in the outbox, in order,
    /// until the next flush.
    fn send(&mut self, msg: ConductorMessage) {
        if self.outbox.is_empty() {
            match self.tx.try_send(msg) {
                Ok(()) => {}
                Err(TrySendError::Full(msg)) => self.outbox.push_back(msg),
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!("Surface channel closed, dropping message");
                }
            }
        } else {
            self.outbox.push_back(msg);
        }
    }

    /// Move queued messages into the surface channel until it is full.
    ///
    /// Returns true if anything was delivered.
    fn flush_outbox(&mut self) -> bool {
        let mut delivered = false;
        while let Some(msg) = self.outbox.pop_front() {
            match self.tx.try_send(msg) {
                Ok(()) => delivered = true,
                Err(TrySendError::Full(msg)) => {
                    self.outbox.push_front(msg);
                    break;
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(
                        dropped = self.outbox.len() + 1,
                        "Surface channel closed, dropping queued messages"
                    );
                    self.outbox.clear();
                    break;
                }
            }
        }
        delivered
    }

    /// Messages waiting for room in the surface channel
    pub fn pending_messages(&self) -> usize {
        self.outbox.len()
    }
}
