use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Top-level application error.
/// All variants carry a human-readable message for display/logging; upstream
/// variants double as the payload of the in-band `error` event.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // ── Asset errors ─────────────────────────────────────────────────────────
    #[error("{asset} not found")]
    AssetNotFound { asset: String },

    #[error("Failed to read {asset}: {source}")]
    AssetUnreadable {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    // ── Upstream (Ollama) errors ─────────────────────────────────────────────
    #[error("Ollama service unavailable at {host}")]
    OllamaUnavailable { host: String },

    #[error("Ollama returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(#[source] reqwest::Error),

    #[error("Upstream read failed: {0}")]
    UpstreamRead(#[source] std::io::Error),

    #[error("No data from Ollama for {seconds}s")]
    UpstreamStalled { seconds: u64 },

    #[error("Ollama closed the stream before completion")]
    UpstreamClosed,

    #[error("Ollama reported an error: {message}")]
    UpstreamReported { message: String },

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Invalid value for {key}: '{value}'")]
    InvalidConfig { key: String, value: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn empty_field(field_name: impl Into<String>) -> Self {
        AppError::EmptyField { field_name: field_name.into() }
    }

    pub fn invalid_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        AppError::InvalidConfig { key: key.into(), value: value.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::AssetNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. } | AppError::InvalidRequest { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_validation() {
            let body = serde_json::json!({ "error": self.to_string() });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        } else if self.is_not_found() {
            (StatusCode::NOT_FOUND, self.to_string()).into_response()
        } else {
            tracing::error!("Request failed: {self}");
            (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(AppError::empty_field("message").is_validation());
        assert!(AppError::InvalidRequest { message: "bad json".into() }.is_validation());
        assert!(!AppError::UpstreamClosed.is_validation());
        assert!(AppError::AssetNotFound { asset: "emotions.txt".into() }.is_not_found());
    }

    #[test]
    fn status_mapping_follows_classification() {
        let resp = AppError::empty_field("message").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::AssetNotFound { asset: "ollama.png".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Unexpected("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_messages_are_human_readable() {
        let err = AppError::UpstreamStatus { status: 404, message: "model 'x' not found".into() };
        assert_eq!(err.to_string(), "Ollama returned 404: model 'x' not found");
        assert_eq!(
            AppError::UpstreamStalled { seconds: 30 }.to_string(),
            "No data from Ollama for 30s"
        );
    }
}
