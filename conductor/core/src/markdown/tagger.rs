//! Fence and Bold Tagger
//!
//! Consumes deltas one at a time and splits each into [`TaggedSpan`]s.
//!
//! Fence detection is per delta: a marker that straddles two deltas (one ends
//! in two backticks, the next starts with one) is not recognised and both
//! halves are tagged with the current state.
//!
//! Bold detection works on the whole response seen so far, because a `**`
//! pair may open in one delta and close several deltas later. Bold is kept as
//! a set of byte ranges over the response buffer and rebuilt from scratch on
//! every qualifying delta.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Code-block delimiter
pub const FENCE: &str = "```";

/// Bold delimiter
pub const BOLD_MARKER: &str = "**";

static BOLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*(.*?)\*\*").expect("valid bold regex"));

/// Styling class of a span
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanKind {
    /// Ordinary text
    Plain,
    /// Inside a code fence, opening marker included
    Code,
    /// Inner text of a `**` pair
    Bold,
}

/// A run of assistant text with a single style
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// The text, exactly as received
    pub text: String,
    /// How the text should be styled
    pub kind: SpanKind,
}

impl TaggedSpan {
    /// Create a span
    pub fn new(text: impl Into<String>, kind: SpanKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Create a plain span
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanKind::Plain)
    }

    /// Create a code span
    pub fn code(text: impl Into<String>) -> Self {
        Self::new(text, SpanKind::Code)
    }
}

/// Result of ingesting one delta
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Spans for this delta, in order. Only `Plain` and `Code` appear here.
    pub spans: Vec<TaggedSpan>,
    /// Whether the bold ranges were rebuilt by this delta
    pub bold_rescanned: bool,
}

/// Incremental fence/bold tagger for a single assistant response
#[derive(Debug, Default)]
pub struct MarkdownTagger {
    inside_code_block: bool,
    /// All text emitted so far, append only
    buffer: String,
    /// Emitted runs over `buffer`, adjacent runs of the same kind merged
    segments: Vec<(Range<usize>, SpanKind)>,
    /// Inner ranges of matched `**` pairs over `buffer`
    bold_ranges: Vec<Range<usize>>,
}

impl MarkdownTagger {
    /// Create a tagger outside any code block
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all state, ready for the next response
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the tagger is currently inside a code fence
    #[must_use]
    pub fn is_inside_code_block(&self) -> bool {
        self.inside_code_block
    }

    /// The response text seen so far
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current bold ranges (byte offsets into [`Self::buffer`])
    #[must_use]
    pub fn bold_ranges(&self) -> &[Range<usize>] {
        &self.bold_ranges
    }

    /// Split one delta into tagged spans and update fence/bold state
    pub fn ingest(&mut self, delta: &str) -> IngestOutcome {
        if delta.is_empty() {
            return IngestOutcome::default();
        }

        let mut spans = Vec::new();
        let mut parts = delta.split(FENCE);

        if let Some(first) = parts.next() {
            if !first.is_empty() {
                spans.push(self.span_for(first));
            }
        }
        for part in parts {
            self.inside_code_block = !self.inside_code_block;
            spans.push(self.span_for(FENCE));
            if !part.is_empty() {
                spans.push(self.span_for(part));
            }
        }

        for span in &spans {
            self.record(span);
        }

        let produced_plain = spans.iter().any(|s| s.kind == SpanKind::Plain);
        let bold_rescanned =
            produced_plain && !self.inside_code_block && delta.contains(BOLD_MARKER);
        if bold_rescanned {
            self.rescan_bold();
        }

        IngestOutcome {
            spans,
            bold_rescanned,
        }
    }

    /// Rebuild bold ranges from the full buffer
    pub fn rescan_bold(&mut self) {
        self.bold_ranges = BOLD_PATTERN
            .captures_iter(&self.buffer)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.range())
            .filter(|range| !range.is_empty())
            .collect();
    }

    /// Texts currently tagged bold
    #[must_use]
    pub fn bold_texts(&self) -> Vec<&str> {
        self.bold_ranges
            .iter()
            .map(|range| &self.buffer[range.clone()])
            .collect()
    }

    /// Render the whole response as spans with bold applied to plain text.
    ///
    /// Concatenating the returned spans reproduces [`Self::buffer`].
    #[must_use]
    pub fn styled_spans(&self) -> Vec<TaggedSpan> {
        let mut out = Vec::new();

        for (range, kind) in &self.segments {
            if *kind != SpanKind::Plain {
                out.push(TaggedSpan::new(&self.buffer[range.clone()], *kind));
                continue;
            }

            let mut cursor = range.start;
            for bold in &self.bold_ranges {
                let start = bold.start.max(range.start);
                let end = bold.end.min(range.end);
                if start >= end || start < cursor {
                    continue;
                }
                if start > cursor {
                    out.push(TaggedSpan::plain(&self.buffer[cursor..start]));
                }
                out.push(TaggedSpan::new(&self.buffer[start..end], SpanKind::Bold));
                cursor = end;
            }
            if cursor < range.end {
                out.push(TaggedSpan::plain(&self.buffer[cursor..range.end]));
            }
        }

        out
    }

    fn span_for(&self, text: &str) -> TaggedSpan {
        if self.inside_code_block {
            TaggedSpan::code(text)
        } else {
            TaggedSpan::plain(text)
        }
    }

    fn record(&mut self, span: &TaggedSpan) {
        let start = self.buffer.len();
        self.buffer.push_str(&span.text);
        let end = self.buffer.len();

        match self.segments.last_mut() {
            Some((range, kind)) if *kind == span.kind && range.end == start => range.end = end,
            _ => self.segments.push((start..end, span.kind)),
        }
    }
}
