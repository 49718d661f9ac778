//! LLM Backend Integration
//!
//! Access to the completion service through a common trait interface.
//!
//! # Usage
//!
//! ```ignore
//! use streamchat_core::backend::{LlmBackend, LlmRequest, OpenAiBackend};
//!
//! let backend = OpenAiBackend::from_config(&config)?;
//! let request = LlmRequest::new("Hello!", "gpt-5.1");
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod openai;
mod traits;

pub use openai::OpenAiBackend;
pub use traits::{LlmBackend, LlmRequest, StreamingToken};
