mod config;
mod errors;
mod models;
mod prompt;
mod relay;
mod routes;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::relay::OllamaRelay;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ollama_chat_relay=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration & upstream client ──────────────────────────────────────
    let config = Arc::new(AppConfig::from_env()?);
    let relay = OllamaRelay::new(config.clone())?;
    info!(
        "Relaying chat to {} (model {}), assets from {}",
        config.generate_url(),
        config.model,
        config.assets_dir.display()
    );

    let app = routes::router(AppState { config: config.clone(), relay });

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");
    info!("Make sure Ollama is running with model {}", config.model);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
