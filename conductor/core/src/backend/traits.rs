//! LLM Backend Traits
//!
//! The Conductor talks to the completion service through [`LlmBackend`], so
//! tests can swap in a scripted backend and alternative providers only need a
//! new implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::composer::OutboundRequest;

/// Token stream events from LLM backends
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamingToken {
    /// A delta of assistant text
    Token(String),
    /// Response completed successfully
    Complete {
        /// Concatenation of every delta sent
        message: String,
    },
    /// The transport failed; no further tokens follow
    Error(String),
}

/// One chat-completions request
#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    /// The user message (already including any history preamble)
    pub prompt: String,
    /// Model to use
    pub model: String,
    /// System prompt
    pub system: Option<String>,
}

impl LlmRequest {
    /// Create a new request with prompt and model
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
        }
    }

    /// Set system prompt
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl From<&OutboundRequest> for LlmRequest {
    fn from(request: &OutboundRequest) -> Self {
        Self::new(request.final_prompt.clone(), request.model.clone())
            .with_system(request.system_prompt.clone())
    }
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name (e.g., "OpenAI-compatible")
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a request and get a streaming response
    ///
    /// Returns a channel receiver that yields tokens as they arrive and ends
    /// with exactly one [`StreamingToken::Complete`] or [`StreamingToken::Error`].
    /// An `Err` here means the request itself failed and nothing was streamed.
    async fn send_streaming(
        &self,
        request: &LlmRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>>;
}
