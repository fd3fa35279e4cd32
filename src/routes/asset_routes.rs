use std::path::Path;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::errors::AppError;
use crate::routes::AppState;

const CHAT_PAGE: &str = "chat.html";
const ASSISTANT_AVATAR: &str = "ollama.png";
const USER_AVATAR: &str = "ollama_user.png";
const EMOTIONS: &str = "emotions.txt";

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET `/` — the chat page
pub async fn index_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    serve_asset(&state.config.assets_dir, CHAT_PAGE, "text/html; charset=utf-8").await
}

/// GET `/ollama.png`
pub async fn assistant_avatar_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    serve_asset(&state.config.assets_dir, ASSISTANT_AVATAR, "image/png").await
}

/// GET `/ollama_user.png`
pub async fn user_avatar_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    serve_asset(&state.config.assets_dir, USER_AVATAR, "image/png").await
}

/// GET `/api/emotions` — raw emotion label list, read on every request
pub async fn emotions_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    serve_asset(&state.config.assets_dir, EMOTIONS, "text/plain; charset=utf-8").await
}

// ── Helper ────────────────────────────────────────────────────────────────────

async fn serve_asset(
    dir: &Path,
    name: &str,
    content_type: &'static str,
) -> Result<impl IntoResponse, AppError> {
    match tokio::fs::read(dir.join(name)).await {
        Ok(bytes) => Ok(([(CONTENT_TYPE, content_type)], bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::AssetNotFound { asset: name.to_string() })
        }
        Err(source) => Err(AppError::AssetUnreadable { asset: name.to_string(), source }),
    }
}
