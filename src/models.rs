use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::GenerationOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One prior exchange, resent by the browser on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

#[cfg(test)]
impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

/// Body of `POST /api/generate` on the Ollama server.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub think: bool,
    #[serde(flatten)]
    pub options: &'a GenerationOptions,
}

/// One newline-delimited JSON object from the Ollama stream.
/// Unknown fields (timings, token counts, context) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpstreamChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// What the browser receives, one per SSE `data:` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamEvent {
    Content(String),
    Done,
    Error(String),
}

impl DownstreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownstreamEvent::Done | DownstreamEvent::Error(_))
    }
}

impl Serialize for DownstreamEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            DownstreamEvent::Content(text) => map.serialize_entry("content", text)?,
            DownstreamEvent::Done => map.serialize_entry("done", &true)?,
            DownstreamEvent::Error(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}
