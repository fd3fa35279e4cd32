pub mod ndjson;

use std::sync::Arc;

use async_stream::stream;
use futures_util::{Stream, TryStreamExt};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{DownstreamEvent, GenerateRequest, UpstreamChunk};
use ndjson::{chunk_events, decode_line, DecodedLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Init,
    Streaming,
    Complete,
    Errored,
    Cancelled,
}

/// Lives inside the generator for the whole call. If the generator is dropped
/// while still INIT/STREAMING the downstream client went away, and dropping the
/// upstream response alongside this guard is what closes the Ollama connection.
struct CallGuard {
    call_id: Uuid,
    state: RelayState,
    content_events: usize,
    malformed_lines: usize,
}

impl CallGuard {
    fn new(call_id: Uuid) -> Self {
        Self { call_id, state: RelayState::Init, content_events: 0, malformed_lines: 0 }
    }

    fn enter(&mut self, next: RelayState) {
        debug!(call_id = %self.call_id, from = ?self.state, to = ?next, "relay state change");
        self.state = next;
    }

    /// Records the terminal state for `event` before it is handed downstream.
    fn settle(&mut self, event: &DownstreamEvent) {
        match event {
            DownstreamEvent::Content(_) => self.content_events += 1,
            DownstreamEvent::Done => self.enter(RelayState::Complete),
            DownstreamEvent::Error(message) => {
                warn!(call_id = %self.call_id, "relay failed: {message}");
                self.enter(RelayState::Errored);
            }
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if matches!(self.state, RelayState::Init | RelayState::Streaming) {
            self.enter(RelayState::Cancelled);
            info!(call_id = %self.call_id, "client disconnected, upstream request dropped");
        }
        if self.malformed_lines > 0 {
            debug!(
                call_id = %self.call_id,
                malformed_lines = self.malformed_lines,
                "skipped malformed upstream lines"
            );
        }
        info!(
            call_id = %self.call_id,
            state = ?self.state,
            content_events = self.content_events,
            "relay finished"
        );
    }
}

/// Streams generations from a local Ollama server.
/// Holds no per-call state; every `relay` call opens its own upstream request.
#[derive(Clone)]
pub struct OllamaRelay {
    client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl OllamaRelay {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AppError::Unexpected(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Lazily relays one generation. The returned stream yields zero or more
    /// `Content` events and then exactly one `Done` or `Error`, after which it
    /// ends. Dropping it early cancels the upstream request.
    pub fn relay(&self, prompt: String) -> impl Stream<Item = DownstreamEvent> + Send + 'static {
        let relay = self.clone();
        let idle_timeout = self.config.idle_timeout;

        stream! {
            let mut guard = CallGuard::new(Uuid::new_v4());
            info!(
                call_id = %guard.call_id,
                model = %relay.config.model,
                prompt_len = prompt.len(),
                "opening upstream generation"
            );

            let response = match relay.open(&prompt).await {
                Ok(response) => response,
                Err(e) => {
                    let event = DownstreamEvent::Error(e.to_string());
                    guard.settle(&event);
                    yield event;
                    return;
                }
            };
            guard.enter(RelayState::Streaming);

            let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
            let mut lines = StreamReader::new(body).split(b'\n');

            loop {
                let line = match tokio::time::timeout(idle_timeout, lines.next_segment()).await {
                    Ok(Ok(Some(line))) => line,
                    Ok(Ok(None)) => {
                        let event = DownstreamEvent::Error(AppError::UpstreamClosed.to_string());
                        guard.settle(&event);
                        yield event;
                        return;
                    }
                    Ok(Err(e)) => {
                        let event = DownstreamEvent::Error(AppError::UpstreamRead(e).to_string());
                        guard.settle(&event);
                        yield event;
                        return;
                    }
                    Err(_) => {
                        let seconds = idle_timeout.as_secs();
                        let event = DownstreamEvent::Error(AppError::UpstreamStalled { seconds }.to_string());
                        guard.settle(&event);
                        yield event;
                        return;
                    }
                };

                let chunk = match decode_line(&line) {
                    DecodedLine::Blank => continue,
                    DecodedLine::Malformed(e) => {
                        guard.malformed_lines += 1;
                        debug!(call_id = %guard.call_id, "skipping malformed upstream line: {e}");
                        continue;
                    }
                    DecodedLine::Chunk(chunk) => chunk,
                };

                for event in chunk_events(chunk) {
                    let terminal = event.is_terminal();
                    guard.settle(&event);
                    yield event;
                    if terminal {
                        return;
                    }
                }
            }
        }
    }

    async fn open(&self, prompt: &str) -> Result<reqwest::Response, AppError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: true,
            think: false,
            options: &self.config.generation,
        };

        let idle_timeout = self.config.idle_timeout;
        let request = self.client.post(self.config.generate_url()).json(&body).send();
        let response = tokio::time::timeout(idle_timeout, request)
            .await
            .map_err(|_| AppError::UpstreamStalled { seconds: idle_timeout.as_secs() })?
            .map_err(|e| {
                if e.is_connect() {
                    AppError::OllamaUnavailable { host: self.config.ollama_base_url.clone() }
                } else {
                    AppError::UpstreamTransport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    debug!("failed to read Ollama error body for {status}: {e}");
                    String::new()
                }
            };
            let message = serde_json::from_str::<UpstreamChunk>(&text)
                .ok()
                .and_then(|chunk| chunk.error)
                .unwrap_or_else(|| {
                    if text.trim().is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        text.trim().to_string()
                    }
                });
            return Err(AppError::UpstreamStatus { status: status.as_u16(), message });
        }

        Ok(response)
    }
}
