//! OpenAI-compatible Backend
//!
//! Streams `POST <endpoint>` with `"stream": true` and decodes the
//! server-sent event body with [`delta_stream`]. Works with any service that
//! speaks the chat-completions protocol.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::traits::{LlmBackend, LlmRequest, StreamingToken};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::streaming::delta_stream;

/// Capacity of the token channel handed to the Conductor
const TOKEN_CHANNEL_CAPACITY: usize = 100;

/// Longest slice of an error body included in a transport error
const MAX_ERROR_BODY: usize = 200;

/// OpenAI-compatible chat-completions client
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Chat-completions URL
    endpoint: String,
    /// Bearer token, empty when unconfigured
    api_key: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OpenAiBackend {
    /// Create a new backend.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http_client,
        })
    }

    /// Create from the effective configuration.
    ///
    /// A missing API key is allowed here; the Conductor refuses to send
    /// until one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        Self::new(
            config.endpoint.clone(),
            config.api_key.clone().unwrap_or_default(),
            config.request_timeout,
        )
    }

    /// The chat-completions URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Authorization header value; keys may be configured with or without the scheme
    fn auth_header(&self) -> String {
        if self.api_key.starts_with("Bearer ") {
            self.api_key.clone()
        } else {
            format!("Bearer {}", self.api_key)
        }
    }

    /// JSON body for a streaming request
    fn build_body(request: &LlmRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": true,
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI-compatible"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .head(&self.endpoint)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn send_streaming(
        &self,
        request: &LlmRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>> {
        let (tx, rx) = mpsc::channel(TOKEN_CHANNEL_CAPACITY);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(ChatError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ChatError::Transport(format!("API returned {status}: {body}")).into());
        }

        let model = request.model.clone();
        let deltas = delta_stream(response.bytes_stream());

        tokio::spawn(async move {
            futures::pin_mut!(deltas);
            let mut full_response = String::new();

            while let Some(item) = deltas.next().await {
                match item {
                    Ok(delta) => {
                        full_response.push_str(&delta);
                        if tx.send(StreamingToken::Token(delta)).await.is_err() {
                            // Receiver dropped, stop streaming
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(model = %model, error = %e, "Response stream failed");
                        let _ = tx.send(StreamingToken::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            let _ = tx
                .send(StreamingToken::Complete {
                    message: full_response,
                })
                .await;
        });

        Ok(rx)
    }
}
