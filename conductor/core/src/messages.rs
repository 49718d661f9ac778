//! Conductor Messages
//!
//! Messages sent from the Conductor to UI surfaces. Surfaces are pure
//! renderers: they append [`ConductorMessage::Segment`]s in arrival order,
//! apply [`ConductorMessage::BoldRanges`] to the assistant text of a turn, and
//! reflect state changes. They hold no conversation logic of their own.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::markdown::SpanKind;
use crate::session::TurnId;

/// Messages from Conductor to UI Surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// A styled run of text to append to the transcript view
    Segment {
        /// Turn this text belongs to, if any
        turn_id: Option<TurnId>,
        /// The text, exactly as it should be shown
        text: String,
        /// How the text should be styled
        tag: DisplayTag,
    },

    /// Bold ranges of a turn's assistant text were rebuilt.
    ///
    /// Offsets are bytes into the concatenation of that turn's assistant
    /// segments. The list replaces any earlier one for the same turn.
    BoldRanges {
        /// Turn whose assistant text the ranges refer to
        turn_id: TurnId,
        /// Inner text ranges of matched `**` pairs
        ranges: Vec<Range<usize>>,
    },

    /// A turn was accepted and its request is being sent
    TurnStarted {
        /// The new turn
        turn_id: TurnId,
    },

    /// A turn finished, normally or with an error
    TurnFinished {
        /// The finished turn
        turn_id: TurnId,
        /// Whether the stream completed normally
        success: bool,
    },

    /// A submission was refused before any request was made
    Rejected {
        /// Why the submission was refused
        reason: String,
    },

    // ============================================
    // System Messages
    // ============================================
    /// Conductor state change
    State {
        /// The new state
        state: ConductorState,
    },

    /// Current selections, sent at start and whenever one changes
    SessionInfo {
        /// Selected model
        model: String,
        /// Selected scenario
        scenario: String,
        /// Whether continuation mode is on
        continuation: bool,
        /// Where turns are saved, if anywhere
        log_destination: Option<String>,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Presentation class of a segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayTag {
    /// Echo of the user's message
    User,
    /// Assistant text outside code fences
    AssistantPlain,
    /// Assistant text inside a code fence, opening marker included
    AssistantCode,
    /// Assistant text between `**` markers
    AssistantBold,
    /// Transport failure shown to the user
    Error,
    /// Client-side notice, never part of the transcript
    SystemNotice,
}

impl DisplayTag {
    /// Whether the segment carries assistant output
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        matches!(
            self,
            Self::AssistantPlain | Self::AssistantCode | Self::AssistantBold
        )
    }
}

impl From<SpanKind> for DisplayTag {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Plain => Self::AssistantPlain,
            SpanKind::Code => Self::AssistantCode,
            SpanKind::Bold => Self::AssistantBold,
        }
    }
}

/// Conductor operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorState {
    /// Starting up, not ready
    Initializing,
    /// Ready for input
    Ready,
    /// Request sent, waiting for the first delta
    Thinking,
    /// Streaming a response
    Responding,
    /// Shutting down
    ShuttingDown,
}

impl ConductorState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Initializing => "Starting up...",
            Self::Ready => "Ready",
            Self::Thinking => "Thinking...",
            Self::Responding => "Responding...",
            Self::ShuttingDown => "Shutting down...",
        }
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Thinking | Self::Responding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_kind_maps_to_assistant_tags() {
        assert_eq!(DisplayTag::from(SpanKind::Plain), DisplayTag::AssistantPlain);
        assert_eq!(DisplayTag::from(SpanKind::Code), DisplayTag::AssistantCode);
        assert_eq!(DisplayTag::from(SpanKind::Bold), DisplayTag::AssistantBold);
        assert!(DisplayTag::AssistantCode.is_assistant());
        assert!(!DisplayTag::SystemNotice.is_assistant());
    }

    #[test]
    fn test_conductor_state_description() {
        assert_eq!(ConductorState::Ready.description(), "Ready");
        assert_eq!(ConductorState::Thinking.description(), "Thinking...");
        assert!(ConductorState::Responding.is_busy());
        assert!(!ConductorState::Ready.is_busy());
    }
}
