//! Response Streaming
//!
//! Decoding of the chat-completions event stream into text deltas. The
//! backend runs [`delta_stream`] on its own task; everything downstream only
//! ever sees plain `String` deltas.

mod decoder;

pub use decoder::{decode_line, delta_stream, SseDecoder, SseRecord, DATA_PREFIX, DONE_SENTINEL};
