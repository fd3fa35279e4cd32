pub mod api_routes;
pub mod asset_routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::relay::OllamaRelay;
use api_routes::chat_handler;
use asset_routes::{assistant_avatar_handler, emotions_handler, index_handler, user_avatar_handler};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub relay: OllamaRelay,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Static assets
        .route("/", get(index_handler))
        .route("/ollama.png", get(assistant_avatar_handler))
        .route("/ollama_user.png", get(user_avatar_handler))
        .route("/api/emotions", get(emotions_handler))
        // Streaming chat
        .route("/api/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
