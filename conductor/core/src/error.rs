//! Error Taxonomy
//!
//! Errors raised by the streaming chat core. The variants map onto the
//! propagation policy the Conductor applies:
//!
//! - [`ChatError::Protocol`]: one malformed stream record. Skipped and logged,
//!   never shown to the user.
//! - [`ChatError::Transport`]: the request or stream failed. Fatal for the
//!   in-flight turn, surfaced as an error segment, partial output still saved.
//! - [`ChatError::Config`] / [`ChatError::State`]: precondition failures.
//!   Rejected before any request is issued and before any turn exists.
//! - [`ChatError::Persist`]: the chat log could not be written. Reported as a
//!   notice; the conversation itself is unaffected.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the chat core
#[derive(Debug, Error)]
pub enum ChatError {
    /// Non-success status, connection failure, or a broken byte stream
    #[error("transport error: {0}")]
    Transport(String),

    /// A single stream record could not be decoded
    #[error("protocol error: {message} (record: {record})")]
    Protocol {
        /// Decoder error description
        message: String,
        /// The offending payload, truncated for logging
        record: String,
    },

    /// Missing or invalid configuration for a request
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not valid for the current transcript state
    #[error("state error: {0}")]
    State(String),

    /// Writing the chat log failed
    #[error("failed to write chat log {path}: {source}")]
    Persist {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

impl ChatError {
    /// Whether this error is recovered locally and never reaches the user
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Whether this error rejects a submission before any turn is created
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Config(_) | Self::State(_))
    }

    pub(crate) fn protocol(message: impl Into<String>, record: &str) -> Self {
        const MAX_RECORD: usize = 120;
        let record = if record.len() > MAX_RECORD {
            let mut end = MAX_RECORD;
            while !record.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &record[..end])
        } else {
            record.to_string()
        };
        Self::Protocol {
            message: message.into(),
            record,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
