//! Server-Sent Events plumbing.
//!
//! One dedicated line-oriented decoder for inbound SSE (RPC backends) and
//! one framing layer for outbound delivery, instead of ad hoc string
//! slicing scattered per backend.

use crate::traits::StreamEvent;
use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

/// Terminal sentinel frame; every outbound stream ends with exactly one
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Wrap a text chunk as one SSE event
pub fn frame_text(chunk: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "text": chunk }))
}

/// Wrap an error message as one SSE event
pub fn frame_error(message: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "error": message }))
}

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Accepting events
    Open,
    /// Saw the terminal sentinel; everything after is dropped
    Terminated,
}

/// One decoded inbound chunk
#[derive(Debug, Clone, PartialEq)]
pub enum SseChunk {
    Text(String),
    Error(String),
}

/// Line-oriented decoder for inbound SSE streams.
///
/// Understands `data: ` payload lines, treats the literal `[DONE]` payload
/// as end-of-stream, and tolerates non-JSON payloads by passing them through
/// as raw text. Non-data lines (`event:`, `id:`, comments, blanks) are
/// ignored.
#[derive(Debug)]
pub struct SseDecoder {
    state: DecoderState,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Open,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DecoderState::Terminated
    }

    /// Decode one line. Returns a chunk for payload lines, None otherwise.
    pub fn feed_line(&mut self, line: &str) -> Option<SseChunk> {
        if self.state == DecoderState::Terminated {
            return None;
        }

        let payload = line.trim().strip_prefix("data: ")?;

        if payload == "[DONE]" {
            self.state = DecoderState::Terminated;
            return None;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                if let Some(error) = value.get("error") {
                    let message = error
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    Some(SseChunk::Error(message))
                } else if let Some(text) = value.get("text").and_then(Value::as_str) {
                    Some(SseChunk::Text(text.to_string()))
                } else {
                    // JSON without a recognized shape still carries data
                    Some(SseChunk::Text(payload.to_string()))
                }
            }
            // Plain text chunk
            Err(_) => Some(SseChunk::Text(payload.to_string())),
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a backend's chunk channel into framed SSE strings.
///
/// Text and error events become their frames; when the channel closes the
/// stream yields exactly one terminal `[DONE]` frame and ends. Nothing is
/// ever delivered after `[DONE]`, including when an error event preceded it.
pub fn bridge_events(rx: mpsc::Receiver<StreamEvent>) -> impl Stream<Item = String> {
    futures::stream::unfold(Some(rx), |state| async move {
        let mut rx = state?;
        match rx.recv().await {
            Some(StreamEvent::Text(chunk)) => Some((frame_text(&chunk), Some(rx))),
            Some(StreamEvent::Error(message)) => Some((frame_error(&message), Some(rx))),
            None => Some((DONE_FRAME.to_string(), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_decoder_json_text_payload() {
        let mut decoder = SseDecoder::new();
        let chunk = decoder.feed_line(r#"data: {"text": "hello"}"#);
        assert_eq!(chunk, Some(SseChunk::Text("hello".to_string())));
    }

    #[test]
    fn test_decoder_error_payload() {
        let mut decoder = SseDecoder::new();
        let chunk = decoder.feed_line(r#"data: {"error": "backend exploded"}"#);
        assert_eq!(chunk, Some(SseChunk::Error("backend exploded".to_string())));
    }

    #[test]
    fn test_decoder_non_json_passthrough() {
        let mut decoder = SseDecoder::new();
        let chunk = decoder.feed_line("data: plain words");
        assert_eq!(chunk, Some(SseChunk::Text("plain words".to_string())));
    }

    #[test]
    fn test_decoder_ignores_non_data_lines() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed_line("event: message"), None);
        assert_eq!(decoder.feed_line(": comment"), None);
        assert_eq!(decoder.feed_line(""), None);
        assert!(!decoder.is_terminated());
    }

    #[test]
    fn test_decoder_terminates_on_done() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed_line("data: [DONE]"), None);
        assert!(decoder.is_terminated());
        // Nothing after the sentinel is ever surfaced
        assert_eq!(decoder.feed_line(r#"data: {"text": "late"}"#), None);
    }

    #[tokio::test]
    async fn test_bridge_ends_with_exactly_one_done() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Text("a".to_string())).await.unwrap();
        tx.send(StreamEvent::Text("b".to_string())).await.unwrap();
        drop(tx);

        let frames: Vec<String> = bridge_events(rx).collect().await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], frame_text("a"));
        assert_eq!(frames[1], frame_text("b"));
        assert_eq!(frames[2], DONE_FRAME);
        assert_eq!(frames.iter().filter(|f| *f == DONE_FRAME).count(), 1);
    }

    #[tokio::test]
    async fn test_bridge_error_event_precedes_done() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Text("partial".to_string()))
            .await
            .unwrap();
        tx.send(StreamEvent::Error("connection lost".to_string()))
            .await
            .unwrap();
        drop(tx);

        let frames: Vec<String> = bridge_events(rx).collect().await;
        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains("connection lost"));
        assert_eq!(frames[2], DONE_FRAME);
    }

    #[tokio::test]
    async fn test_bridge_empty_stream_still_terminated() {
        let (tx, rx) = mpsc::channel::<StreamEvent>(1);
        drop(tx);

        let frames: Vec<String> = bridge_events(rx).collect().await;
        assert_eq!(frames, vec![DONE_FRAME.to_string()]);
    }

    #[test]
    fn test_frame_shapes() {
        assert_eq!(frame_text("hi"), "data: {\"text\":\"hi\"}\n\n");
        assert_eq!(
            frame_error("bad"),
            "data: {\"error\":\"bad\"}\n\n"
        );
    }
}
