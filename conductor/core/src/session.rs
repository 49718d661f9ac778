//! Conversation Accumulator
//!
//! Owns the transcript for the lifetime of the process: an ordered list of
//! turns, each pairing the user's original text with the (tag-stripped)
//! assistant reply.
//!
//! # Single writer
//!
//! The accumulator is not synchronised. The Conductor owns it and applies
//! every delta from its own task; backend tasks never touch it directly.
//! At most one turn is open at a time, which is also what enforces the
//! single-request-in-flight rule.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::markdown::TaggedSpan;

/// Turn identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl TurnId {
    /// Generate a new unique turn ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn_{}", self.0)
    }
}

/// Lifecycle of a turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnStatus {
    /// Assistant output is still arriving
    Open,
    /// Stream finished normally
    Completed,
    /// Stream or request failed; assistant text holds whatever arrived
    Failed {
        /// Error description
        error: String,
    },
}

/// One user message and the assistant's reply
#[derive(Clone, Debug)]
pub struct Turn {
    /// Unique turn ID
    pub id: TurnId,
    /// The user's text as typed (never includes a continuation preamble)
    pub user_text: String,
    /// Assistant reply, tags stripped
    pub assistant_text: String,
    /// Model identifier the request was sent to
    pub model: String,
    /// Scenario name the system prompt came from
    pub scenario: String,
    /// When the turn was started
    pub timestamp: DateTime<Local>,
    /// Lifecycle status
    pub status: TurnStatus,
}

impl Turn {
    /// Whether assistant output may still be appended
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TurnStatus::Open
    }
}

/// Handle to the open turn, returned by [`ConversationAccumulator::begin_turn`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnHandle {
    id: TurnId,
}

impl TurnHandle {
    /// The turn this handle refers to
    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }
}

/// Ordered transcript with at most one open turn
#[derive(Debug, Default)]
pub struct ConversationAccumulator {
    turns: Vec<Turn>,
    open: Option<TurnId>,
}

impl ConversationAccumulator {
    /// Create an empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn with empty assistant text.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::State`] if another turn is still open.
    pub fn begin_turn(
        &mut self,
        user_text: impl Into<String>,
        model: impl Into<String>,
        scenario: impl Into<String>,
    ) -> Result<TurnHandle, ChatError> {
        if let Some(open) = self.open {
            return Err(ChatError::State(format!(
                "{open} is still in progress; wait for it to finish"
            )));
        }

        let turn = Turn {
            id: TurnId::new(),
            user_text: user_text.into(),
            assistant_text: String::new(),
            model: model.into(),
            scenario: scenario.into(),
            timestamp: Local::now(),
            status: TurnStatus::Open,
        };
        let handle = TurnHandle { id: turn.id };

        tracing::info!(turn = %turn.id, model = %turn.model, scenario = %turn.scenario, "Turn started");

        self.open = Some(turn.id);
        self.turns.push(turn);
        Ok(handle)
    }

    /// Append tag-stripped span text to the open turn.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::State`] if the handle does not refer to the open turn.
    pub fn append_assistant_spans(
        &mut self,
        handle: &TurnHandle,
        spans: &[TaggedSpan],
    ) -> Result<(), ChatError> {
        let turn = self.open_turn_mut(handle)?;
        for span in spans {
            turn.assistant_text.push_str(&span.text);
        }
        Ok(())
    }

    /// Close the turn after a normal end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::State`] if the handle does not refer to the open turn.
    pub fn end_turn(&mut self, handle: &TurnHandle) -> Result<&Turn, ChatError> {
        self.close(handle, TurnStatus::Completed)
    }

    /// Close the turn after a transport failure, keeping the partial reply.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::State`] if the handle does not refer to the open turn.
    pub fn fail_turn(
        &mut self,
        handle: &TurnHandle,
        error: impl Into<String>,
    ) -> Result<&Turn, ChatError> {
        self.close(
            handle,
            TurnStatus::Failed {
                error: error.into(),
            },
        )
    }

    /// Render every turn, open or closed, as alternating user/assistant blocks.
    ///
    /// Newest last. No system notices or metadata lines are included.
    #[must_use]
    pub fn flatten_history(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                format!(
                    "--- User ---\n{}\n\n--- Assistant ---\n{}",
                    turn.user_text.trim_end(),
                    turn.assistant_text.trim_end()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Look up a turn by ID
    #[must_use]
    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// The open turn, if any
    #[must_use]
    pub fn open_turn(&self) -> Option<&Turn> {
        self.open.and_then(|id| self.get(id))
    }

    /// Whether a turn is in progress
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.open.is_some()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been started yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn open_turn_mut(&mut self, handle: &TurnHandle) -> Result<&mut Turn, ChatError> {
        if self.open != Some(handle.id) {
            return Err(ChatError::State(format!("{} is not open", handle.id)));
        }
        self.turns
            .iter_mut()
            .rev()
            .find(|t| t.id == handle.id)
            .ok_or_else(|| ChatError::State(format!("{} not found", handle.id)))
    }

    fn close(&mut self, handle: &TurnHandle, status: TurnStatus) -> Result<&Turn, ChatError> {
        let turn = self.open_turn_mut(handle)?;
        turn.status = status;
        tracing::info!(
            turn = %turn.id,
            status = ?turn.status,
            chars = turn.assistant_text.len(),
            "Turn finished"
        );
        self.open = None;
        self.get(handle.id)
            .ok_or_else(|| ChatError::State(format!("{} not found", handle.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::SpanKind;

    #[test]
    fn test_turn_lifecycle() {
        let mut acc = ConversationAccumulator::new();
        let handle = acc.begin_turn("Hello", "gpt-5.1", "General assistant").unwrap();
        assert!(acc.is_busy());

        acc.append_assistant_spans(
            &handle,
            &[TaggedSpan::plain("Hi "), TaggedSpan::code("```x```")],
        )
        .unwrap();
        acc.append_assistant_spans(&handle, &[]).unwrap();

        let turn = acc.end_turn(&handle).unwrap();
        assert_eq!(turn.assistant_text, "Hi ```x```");
        assert_eq!(turn.status, TurnStatus::Completed);
        assert!(!acc.is_busy());
    }

    #[test]
    fn test_begin_twice_is_state_error() {
        let mut acc = ConversationAccumulator::new();
        let _handle = acc.begin_turn("one", "m", "s").unwrap();
        let err = acc.begin_turn("two", "m", "s").unwrap_err();
        assert!(matches!(err, ChatError::State(_)));
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_append_after_end_is_state_error() {
        let mut acc = ConversationAccumulator::new();
        let handle = acc.begin_turn("q", "m", "s").unwrap();
        acc.end_turn(&handle).unwrap();

        let err = acc
            .append_assistant_spans(&handle, &[TaggedSpan::new("late", SpanKind::Plain)])
            .unwrap_err();
        assert!(matches!(err, ChatError::State(_)));
        assert!(matches!(acc.end_turn(&handle), Err(ChatError::State(_))));
    }

    #[test]
    fn test_failed_turn_keeps_partial_text() {
        let mut acc = ConversationAccumulator::new();
        let handle = acc.begin_turn("q", "m", "s").unwrap();
        acc.append_assistant_spans(&handle, &[TaggedSpan::plain("partial")])
            .unwrap();

        let turn = acc.fail_turn(&handle, "connection reset").unwrap();
        assert_eq!(turn.assistant_text, "partial");
        assert_eq!(
            turn.status,
            TurnStatus::Failed {
                error: "connection reset".to_string()
            }
        );

        // A new turn may start after a failure
        assert!(acc.begin_turn("again", "m", "s").is_ok());
    }

    #[test]
    fn test_flatten_history() {
        let mut acc = ConversationAccumulator::new();
        assert_eq!(acc.flatten_history(), "");

        let first = acc.begin_turn("First question", "m", "s").unwrap();
        acc.append_assistant_spans(&first, &[TaggedSpan::plain("First answer\n")])
            .unwrap();
        acc.end_turn(&first).unwrap();

        let second = acc.begin_turn("Second question", "m", "s").unwrap();
        acc.append_assistant_spans(&second, &[TaggedSpan::plain("Partial")])
            .unwrap();

        let history = acc.flatten_history();
        assert_eq!(
            history,
            "--- User ---\nFirst question\n\n--- Assistant ---\nFirst answer\n\n\
             --- User ---\nSecond question\n\n--- Assistant ---\nPartial"
        );
        assert_eq!(history, acc.flatten_history());
    }

    #[test]
    fn test_turn_ids_unique() {
        assert_ne!(TurnId::new(), TurnId::new());
    }
}
