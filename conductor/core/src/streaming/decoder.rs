//! Server-Sent Event Decoder
//!
//! Turns the chat-completions event stream into text deltas. The wire format
//! is line oriented:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Byte chunks from the transport may split lines (and UTF-8 sequences)
//! anywhere, so [`SseDecoder`] buffers raw bytes until a full line is seen.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::ChatError;

/// Prefix of every line that carries a record
pub const DATA_PREFIX: &str = "data:";

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded, non-ignorable line of the event stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseRecord {
    /// Non-empty content delta
    Delta(String),
    /// End-of-stream sentinel
    Done,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a single line of the event stream.
///
/// Returns `Ok(None)` for lines that carry nothing: blank lines, comments,
/// non-`data:` fields, and records whose content is missing or empty.
///
/// # Errors
///
/// Returns [`ChatError::Protocol`] when a `data:` payload is not valid JSON of
/// the expected shape. Callers skip the record and keep reading.
pub fn decode_line(line: &str) -> Result<Option<SseRecord>, ChatError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return Ok(Some(SseRecord::Done));
    }
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: ChunkPayload =
        serde_json::from_str(payload).map_err(|e| ChatError::protocol(e.to_string(), payload))?;

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());

    Ok(content.map(SseRecord::Delta))
}

/// Incremental line splitter and record decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, incomplete line
    pending: Vec<u8>,
    /// Set once the sentinel has been seen
    done: bool,
}

impl SseDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end-of-stream sentinel has been decoded
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes, returning every record completed by it.
    ///
    /// Nothing is returned once the sentinel has been seen.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseRecord, ChatError>> {
        let mut records = Vec::new();
        if self.done {
            return records;
        }

        for &byte in chunk {
            if byte != b'\n' {
                self.pending.push(byte);
                continue;
            }

            let line = std::mem::take(&mut self.pending);
            if let Some(record) = self.decode_pending(&line) {
                let is_done = matches!(record, Ok(SseRecord::Done));
                records.push(record);
                if is_done {
                    break;
                }
            }
        }

        records
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<Result<SseRecord, ChatError>> {
        if self.done || self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        self.decode_pending(&line)
    }

    fn decode_pending(&mut self, line: &[u8]) -> Option<Result<SseRecord, ChatError>> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches('\r');
        match decode_line(text) {
            Ok(Some(SseRecord::Done)) => {
                self.done = true;
                Some(Ok(SseRecord::Done))
            }
            Ok(record) => record.map(Ok),
            Err(e) => Some(Err(e)),
        }
    }
}

struct DeltaStreamState<S> {
    source: S,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Adapt a transport byte stream into a lazy stream of text deltas.
///
/// The returned stream yields `Ok(delta)` for every non-empty content record,
/// ends after the sentinel (or when the source ends), and yields a single
/// [`ChatError::Transport`] before ending if the source fails. Malformed
/// records are logged and skipped.
pub fn delta_stream<S, B, E>(source: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = DeltaStreamState {
        source: Box::pin(source),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.ready.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }

            match state.source.next().await {
                Some(Ok(bytes)) => {
                    let records = state.decoder.push(bytes.as_ref());
                    state.enqueue(records);
                    if state.decoder.is_done() {
                        state.finished = true;
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.ready.clear();
                    return Some((Err(ChatError::Transport(e.to_string())), state));
                }
                None => {
                    let tail = state.decoder.finish().into_iter().collect();
                    state.enqueue(tail);
                    state.finished = true;
                }
            }
        }
    })
}

impl<S> DeltaStreamState<S> {
    fn enqueue(&mut self, records: Vec<Result<SseRecord, ChatError>>) {
        for record in records {
            match record {
                Ok(SseRecord::Delta(text)) => self.ready.push_back(text),
                Ok(SseRecord::Done) => {}
                Err(e) => tracing::debug!(error = %e, "Skipping malformed stream record"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    #[test]
    fn test_decode_line_variants() {
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#).unwrap(),
            Some(SseRecord::Delta("hi".to_string()))
        );
        assert_eq!(decode_line("data: [DONE]").unwrap(), Some(SseRecord::Done));
        assert_eq!(decode_line("data:[DONE]").unwrap(), Some(SseRecord::Done));
        assert_eq!(decode_line(": keep-alive").unwrap(), None);
        assert_eq!(decode_line("event: message").unwrap(), None);
        assert_eq!(decode_line("").unwrap(), None);
    }

    #[test]
    fn test_empty_content_is_filtered() {
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
        assert_eq!(decode_line(r#"data: {"choices":[]}"#).unwrap(), None);
        assert_eq!(decode_line(r#"data: {"id":"x"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_record_is_protocol_error() {
        let err = decode_line("data: {not json").unwrap_err();
        assert!(matches!(err, ChatError::Protocol { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let wire = format!("{}{}data: [DONE]\n", data("Hel"), data("lo"));
        let bytes = wire.as_bytes();

        let mut decoder = SseDecoder::new();
        let mut deltas = Vec::new();
        for chunk in bytes.chunks(7) {
            for record in decoder.push(chunk) {
                if let SseRecord::Delta(text) = record.unwrap() {
                    deltas.push(text);
                }
            }
        }

        assert_eq!(deltas, vec!["Hel".to_string(), "lo".to_string()]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_decoder_handles_split_utf8_and_crlf() {
        let wire = data("héllo").replace('\n', "\r\n");
        let bytes = wire.as_bytes();
        let split = wire.find('é').unwrap() + 1;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let records = decoder.push(&bytes[split..]);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records.into_iter().next().unwrap().unwrap(),
            SseRecord::Delta("héllo".to_string())
        );
    }

    #[test]
    fn test_decoder_ignores_input_after_sentinel() {
        let mut decoder = SseDecoder::new();
        let wire = format!("data: [DONE]\n{}", data("late"));
        let records = decoder.push(wire.as_bytes());
        assert_eq!(records.len(), 1);
        assert!(decoder.push(data("later").as_bytes()).is_empty());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let wire = data("tail");
        let trimmed = wire.trim_end();
        assert!(decoder.push(trimmed.as_bytes()).is_empty());
        assert_eq!(
            decoder.finish().unwrap().unwrap(),
            SseRecord::Delta("tail".to_string())
        );
    }

    #[tokio::test]
    async fn test_delta_stream_skips_malformed_records() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(data("a").into_bytes()),
            Ok(b"data: {broken\n\n".to_vec()),
            Ok(data("b").into_bytes()),
            Ok(b"data: [DONE]\n\n".to_vec()),
            Ok(data("never").into_bytes()),
        ];

        let deltas: Vec<_> = delta_stream(futures::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(deltas, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_delta_stream_transport_failure_aborts() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(data("a").into_bytes()),
            Err("connection reset".to_string()),
            Ok(data("b").into_bytes()),
        ];

        let items: Vec<_> = delta_stream(futures::stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(ChatError::Transport(_))));
    }

    #[tokio::test]
    async fn test_delta_stream_ends_without_sentinel() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(data("only").into_bytes())];
        let items: Vec<_> = delta_stream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "only");
    }
}
