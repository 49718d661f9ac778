//! Incremental Markdown Tagging
//!
//! Partial markdown styling for streamed assistant output. Only two constructs
//! are recognised: triple-backtick code fences and `**bold**` pairs. Anything
//! else passes through as plain text.

mod tagger;

pub use tagger::{IngestOutcome, MarkdownTagger, SpanKind, TaggedSpan, BOLD_MARKER, FENCE};
