//! Display State Types
//!
//! Everything the TUI knows about the conversation, derived only from
//! [`ConductorMessage`]s. Segments are kept in arrival order; bold ranges are
//! overlaid on a turn's plain assistant text when the frame is laid out.

use std::collections::HashMap;
use std::ops::Range;

use streamchat_core::{ConductorMessage, ConductorState, DisplayTag, TurnId};

/// A styled run received from the Conductor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplaySegment {
    /// Owning turn, if any
    pub turn_id: Option<TurnId>,
    /// Text as received
    pub text: String,
    /// Presentation class
    pub tag: DisplayTag,
    /// Byte offset of this run within its turn's assistant text
    pub assistant_offset: usize,
}

/// Display state for the TUI
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation runs in arrival order
    pub segments: Vec<DisplaySegment>,
    /// Current Conductor state
    pub conductor_state: ConductorState,
    /// Selected model
    pub model: String,
    /// Selected scenario
    pub scenario: String,
    /// Continuation mode flag
    pub continuation: bool,
    /// Chat log destination, if any
    pub log_destination: Option<String>,
    /// Most recent rejection, cleared when a turn starts
    pub status_message: Option<String>,
    /// Goodbye text once the Conductor asked us to quit
    pub quit_message: Option<String>,
    /// Set when a Quit message arrives
    pub quit_requested: bool,

    assistant_len: HashMap<TurnId, usize>,
    bold_ranges: HashMap<TurnId, Vec<Range<usize>>>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            conductor_state: ConductorState::Initializing,
            model: String::new(),
            scenario: String::new(),
            continuation: true,
            log_destination: None,
            status_message: None,
            quit_message: None,
            quit_requested: false,
            assistant_len: HashMap::new(),
            bold_ranges: HashMap::new(),
        }
    }
}

impl DisplayState {
    /// Apply a message from the Conductor
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            ConductorMessage::Segment { turn_id, text, tag } => {
                self.push_segment(turn_id, text, tag);
            }
            ConductorMessage::BoldRanges { turn_id, ranges } => {
                self.bold_ranges.insert(turn_id, ranges);
            }
            ConductorMessage::TurnStarted { .. } => {
                self.status_message = None;
            }
            ConductorMessage::TurnFinished { turn_id, success } => {
                tracing::debug!(turn = %turn_id, success, "Turn finished");
            }
            ConductorMessage::Rejected { reason } => {
                self.status_message = Some(reason);
            }
            ConductorMessage::State { state } => {
                self.conductor_state = state;
            }
            ConductorMessage::SessionInfo {
                model,
                scenario,
                continuation,
                log_destination,
            } => {
                self.model = model;
                self.scenario = scenario;
                self.continuation = continuation;
                self.log_destination = log_destination;
            }
            ConductorMessage::Quit { message } => {
                self.quit_message = message;
                self.quit_requested = true;
            }
        }
    }

    fn push_segment(&mut self, turn_id: Option<TurnId>, text: String, tag: DisplayTag) {
        if text.is_empty() {
            return;
        }

        let mut assistant_offset = 0;
        if let (Some(id), true) = (turn_id, tag.is_assistant()) {
            let len = self.assistant_len.entry(id).or_insert(0);
            assistant_offset = *len;
            *len += text.len();
        }

        // Merge with the previous run when nothing would change visually
        if let Some(last) = self.segments.last_mut() {
            if last.tag == tag && last.turn_id == turn_id && !tag.is_assistant() {
                last.text.push_str(&text);
                return;
            }
        }

        self.segments.push(DisplaySegment {
            turn_id,
            text,
            tag,
            assistant_offset,
        });
    }

    /// Whether the Conductor has a turn in flight
    pub fn is_busy(&self) -> bool {
        self.conductor_state.is_busy()
    }

    /// Runs to draw, with bold ranges applied to plain assistant text
    pub fn styled_runs(&self) -> Vec<(String, DisplayTag)> {
        let mut runs = Vec::with_capacity(self.segments.len());

        for seg in &self.segments {
            let ranges = match (seg.tag, seg.turn_id) {
                (DisplayTag::AssistantPlain, Some(id)) => self.bold_ranges.get(&id),
                _ => None,
            };
            match ranges {
                Some(ranges) if !ranges.is_empty() => split_bold(seg, ranges, &mut runs),
                _ => runs.push((seg.text.clone(), seg.tag)),
            }
        }

        runs
    }
}

/// Split one plain segment where it intersects bold ranges
fn split_bold(
    seg: &DisplaySegment,
    ranges: &[Range<usize>],
    out: &mut Vec<(String, DisplayTag)>,
) {
    let start = seg.assistant_offset;
    let end = start + seg.text.len();
    let mut cursor = 0;

    for range in ranges {
        let lo = range.start.max(start);
        let hi = range.end.min(end);
        if lo >= hi {
            continue;
        }
        let (lo, hi) = (lo - start, hi - start);
        let (Some(before), Some(bold)) = (seg.text.get(cursor..lo), seg.text.get(lo..hi)) else {
            continue;
        };
        if !before.is_empty() {
            out.push((before.to_string(), DisplayTag::AssistantPlain));
        }
        out.push((bold.to_string(), DisplayTag::AssistantBold));
        cursor = hi;
    }

    if let Some(rest) = seg.text.get(cursor..) {
        if !rest.is_empty() {
            out.push((rest.to_string(), DisplayTag::AssistantPlain));
        }
    }
}
