//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - ConductorClient for orchestration
//! - DisplayState for rendering

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

use streamchat_core::ChatConfig;

use crate::conductor_client::ConductorClient;
use crate::display::DisplayState;
use crate::theme::{style_for, ACCENT_MAGENTA, BUSY_YELLOW, DIM_GRAY, ERROR_RED, USER_GREEN};
use crate::widgets::{TextBlock, TextBlockState};

/// Input box height (lines) for text wrapping
const INPUT_HEIGHT: u16 = 5;

/// Lines moved per mouse wheel step
const WHEEL_STEP: usize = 3;

/// Input prefix that picks the chat log directory instead of sending a message
const LOG_DIR_COMMAND: &str = "/logdir";

/// Main application state
pub struct App {
    running: bool,

    conductor: ConductorClient,
    display: DisplayState,

    input_buffer: String,
    conversation: TextBlockState,
    size: (u16, u16),
}

impl App {
    /// Create a new App instance
    pub fn new(config: ChatConfig) -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;

        Ok(Self {
            running: true,
            conductor: ConductorClient::new(config)?,
            display: DisplayState::default(),
            input_buffer: String::new(),
            conversation: TextBlockState::default(),
            size,
        })
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let frame_duration = Duration::from_millis(33);
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        if let Err(e) = self.conductor.start().await {
            tracing::warn!("Conductor start error: {}", e);
        }
        self.process_conductor_messages();
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            // Only handle Press events (not Release or Repeat)
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Mouse(mouse) => self.handle_mouse(mouse),
                            Event::Resize(w, h) => self.size = (w, h),
                            _ => {}
                        }
                    }
                }

                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            self.conductor.poll_streaming().await;
            self.process_conductor_messages();

            self.render(terminal)?;

            if self.display.quit_requested {
                self.running = false;
            }

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Goodbye text from the Conductor, if it sent one
    pub fn goodbye(&self) -> Option<&str> {
        self.display.quit_message.as_deref()
    }

    fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
    }

    async fn handle_key(&mut self, key: event::KeyEvent) {
        let result = match key.code {
            KeyCode::Esc => self.quit().await,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit().await
            }

            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.input_buffer.push('\n');
                Ok(())
            }
            KeyCode::Enter => self.submit().await,

            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                Ok(())
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
                Ok(())
            }

            KeyCode::F(2) => {
                let enabled = !self.display.continuation;
                self.conductor.set_continuation(enabled).await
            }
            KeyCode::F(3) => self.conductor.cycle_model().await,
            KeyCode::F(4) => self.conductor.cycle_scenario().await,

            KeyCode::PageUp => {
                self.conversation.scroll_up(self.page_size());
                Ok(())
            }
            KeyCode::PageDown => {
                self.conversation.scroll_down(self.page_size());
                Ok(())
            }
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.conversation.scroll_to_top();
                Ok(())
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.conversation.scroll_to_bottom();
                Ok(())
            }

            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!(key = ?key.code, "Key action failed: {}", e);
            self.display.status_message = Some(e.to_string());
        }
    }

    fn handle_mouse(&mut self, mouse: event::MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.conversation.scroll_up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.conversation.scroll_down(WHEEL_STEP),
            _ => {}
        }
    }

    async fn submit(&mut self) -> anyhow::Result<()> {
        // One turn at a time; the input stays put until the response ends
        if self.conductor.is_busy() || self.input_buffer.trim().is_empty() {
            return Ok(());
        }

        if let Some(dir) = log_dir_argument(&self.input_buffer) {
            if dir.is_empty() {
                self.display.status_message = Some(format!("usage: {LOG_DIR_COMMAND} DIR"));
                return Ok(());
            }
            let path = PathBuf::from(dir);
            self.input_buffer.clear();
            self.display.status_message = None;
            return self.conductor.set_log_dir(path).await;
        }

        let message = std::mem::take(&mut self.input_buffer);
        self.conversation.scroll_to_bottom();
        self.conductor.send_message(message).await
    }

    async fn quit(&mut self) -> anyhow::Result<()> {
        self.running = false;
        self.conductor.request_quit().await?;
        self.process_conductor_messages();
        Ok(())
    }

    fn page_size(&self) -> usize {
        (self.size.1.saturating_sub(INPUT_HEIGHT + 1) / 2).max(1) as usize
    }

    fn render(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> anyhow::Result<()> {
        let runs: Vec<(String, Style)> = self
            .display
            .styled_runs()
            .into_iter()
            .map(|(text, tag)| (text, style_for(tag)))
            .collect();
        let status = self.status_line();
        let input = &self.input_buffer;
        let conversation = &mut self.conversation;

        terminal.draw(|frame| {
            let [conversation_area, input_area, status_area] = Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(INPUT_HEIGHT),
                Constraint::Length(1),
            ])
            .areas(frame.area());

            frame.render_stateful_widget(TextBlock::new(&runs), conversation_area, conversation);
            render_input(frame.buffer_mut(), input_area, input);
            frame.render_widget(Paragraph::new(status), status_area);
        })?;

        Ok(())
    }

    fn status_line(&self) -> Line<'static> {
        let state_style = if self.display.is_busy() {
            Style::default().fg(BUSY_YELLOW)
        } else {
            Style::default().fg(ACCENT_MAGENTA)
        };
        let dim = Style::default().fg(DIM_GRAY);

        let mut spans = vec![
            Span::styled(format!(" {}", self.display.conductor_state.description()), state_style),
            Span::styled(" | ", dim),
            Span::styled(
                self.display.model.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" | {}", self.display.scenario), dim),
            Span::styled(
                format!(
                    " | continuation {}",
                    if self.display.continuation { "on" } else { "off" }
                ),
                dim,
            ),
            Span::styled(
                format!(
                    " | log: {}",
                    self.display.log_destination.as_deref().unwrap_or("not set")
                ),
                dim,
            ),
        ];

        if self.conversation.scroll_offset > 0 {
            spans.push(Span::styled(
                format!(" [^{} lines]", self.conversation.scroll_offset),
                Style::default().fg(Color::Yellow),
            ));
        }

        match &self.display.status_message {
            Some(reason) => spans.push(Span::styled(
                format!(" | {reason}"),
                Style::default().fg(ERROR_RED),
            )),
            None if self.display.log_destination.is_none() => spans.push(Span::styled(
                format!(" | {LOG_DIR_COMMAND} DIR to start saving  Esc quit"),
                Style::default().fg(BUSY_YELLOW),
            )),
            None => spans.push(Span::styled(
                " | F2 continuation  F3 model  F4 scenario  Esc quit",
                dim,
            )),
        }

        Line::from(spans)
    }
}

/// Directory named by a `/logdir DIR` input line, if the line is that command
fn log_dir_argument(input: &str) -> Option<&str> {
    let rest = input.trim().strip_prefix(LOG_DIR_COMMAND)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Draw the separator and the wrapped input text, keeping the tail visible
fn render_input(buf: &mut Buffer, area: Rect, input: &str) {
    if area.height == 0 {
        return;
    }

    let separator = "-".repeat(area.width as usize);
    buf.set_string(area.x, area.y, &separator, Style::default().fg(Color::DarkGray));

    let text_height = area.height.saturating_sub(1) as usize;
    let text_width = area.width.saturating_sub(1) as usize;
    if text_width < 5 || text_height < 1 {
        return;
    }

    let full_input = format!("You: {input}_");
    let wrapped: Vec<String> = textwrap::wrap(&full_input, text_width)
        .iter()
        .map(ToString::to_string)
        .collect();
    let skip = wrapped.len().saturating_sub(text_height);

    for (i, line) in wrapped.iter().skip(skip).enumerate() {
        let y = area.y + 1 + i as u16;
        buf.set_string(area.x, y, line, Style::default().fg(USER_GREEN));
    }

    if skip > 0 {
        buf.set_string(
            area.x + area.width.saturating_sub(3),
            area.y,
            "^",
            Style::default().fg(Color::Yellow),
        );
    }
}
