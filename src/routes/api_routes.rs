use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::routes::AppState;

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/api/chat` — validates, builds the persona prompt and streams the
/// reply back as `data: <json>` SSE frames.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::InvalidRequest {
        message: rejection.body_text(),
    })?;
    validate(&request)?;

    debug!(
        history_turns = request.history.len(),
        message_len = request.message.len(),
        "accepted chat request"
    );
    let prompt = state.config.persona.compose(&request.message, &request.history);

    let frames = state
        .relay
        .relay(prompt)
        .map(|event| Event::default().json_data(&event));
    Ok(Sse::new(frames))
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn validate(request: &ChatRequest) -> Result<(), AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::empty_field("message"));
    }
    Ok(())
}
