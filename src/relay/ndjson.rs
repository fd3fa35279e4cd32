//! Per-line decoding of Ollama's newline-delimited JSON stream.

use crate::errors::AppError;
use crate::models::{DownstreamEvent, UpstreamChunk};

#[derive(Debug)]
pub enum DecodedLine {
    Blank,
    /// Not JSON, truncated, or not valid UTF-8. Dropped without an event.
    Malformed(serde_json::Error),
    Chunk(UpstreamChunk),
}

pub fn decode_line(line: &[u8]) -> DecodedLine {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return DecodedLine::Blank;
    }
    match serde_json::from_slice::<UpstreamChunk>(line) {
        Ok(chunk) => DecodedLine::Chunk(chunk),
        Err(e) => DecodedLine::Malformed(e),
    }
}

/// Events produced by one chunk, in emission order. A terminal event, if
/// any, is always last.
pub fn chunk_events(chunk: UpstreamChunk) -> Vec<DownstreamEvent> {
    if let Some(message) = chunk.error {
        return vec![DownstreamEvent::Error(AppError::UpstreamReported { message }.to_string())];
    }

    let mut events = Vec::with_capacity(2);
    if let Some(text) = chunk.response.filter(|text| !text.is_empty()) {
        events.push(DownstreamEvent::Content(text));
    }
    if chunk.done {
        events.push(DownstreamEvent::Done);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(line: &str) -> Option<Vec<DownstreamEvent>> {
        match decode_line(line.as_bytes()) {
            DecodedLine::Chunk(chunk) => Some(chunk_events(chunk)),
            _ => None,
        }
    }

    #[test]
    fn blank_lines_are_recognised() {
        assert!(matches!(decode_line(b""), DecodedLine::Blank));
        assert!(matches!(decode_line(b"  \t"), DecodedLine::Blank));
        assert!(matches!(decode_line(b"\r"), DecodedLine::Blank));
    }

    #[test]
    fn garbage_is_malformed_not_fatal() {
        assert!(matches!(decode_line(b"garbled-not-json"), DecodedLine::Malformed(_)));
        assert!(matches!(decode_line(br#"{"response":"trunc"#), DecodedLine::Malformed(_)));
        assert!(matches!(decode_line(b"{\"response\":\"\xff\xfe\"}"), DecodedLine::Malformed(_)));
    }

    #[test]
    fn crlf_terminated_lines_parse() {
        assert_eq!(
            events("{\"response\":\"A\"}\r"),
            Some(vec![DownstreamEvent::Content("A".into())])
        );
    }

    #[test]
    fn text_precedes_done_on_the_final_chunk() {
        assert_eq!(
            events(r#"{"response":"C","done":true}"#),
            Some(vec![DownstreamEvent::Content("C".into()), DownstreamEvent::Done])
        );
    }

    #[test]
    fn empty_text_emits_nothing() {
        assert_eq!(events(r#"{"response":"","done":false}"#), Some(vec![]));
        assert_eq!(events(r#"{"response":"","done":true}"#), Some(vec![DownstreamEvent::Done]));
        assert_eq!(events(r#"{"model":"qwen3:32b"}"#), Some(vec![]));
    }

    #[test]
    fn reported_errors_become_terminal_error_events() {
        let out = events(r#"{"error":"model requires more system memory"}"#).unwrap();
        assert_eq!(
            out,
            vec![DownstreamEvent::Error(
                "Ollama reported an error: model requires more system memory".into()
            )]
        );
        assert!(out[0].is_terminal());
    }
}
