//! Stub Ollama servers for relay and route tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::Stream;
use serde_json::Value;

use crate::config::AppConfig;

/// Counts and captures the generation requests a stub upstream receives.
#[derive(Clone, Default)]
pub struct Recorder {
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.bodies.lock().unwrap().last().cloned()
    }
}

/// `POST /api/generate` answering every request with a fresh body from `make_body`.
pub fn generate_route<F, S>(recorder: Recorder, make_body: F) -> Router
where
    F: Fn() -> S + Clone + Send + Sync + 'static,
    S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
{
    Router::new().route(
        "/api/generate",
        post(move |Json(body): Json<Value>| async move {
            recorder.hits.fetch_add(1, Ordering::SeqCst);
            recorder.bodies.lock().unwrap().push(body);
            Response::builder()
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(Body::from_stream(make_body()))
                .unwrap()
        }),
    )
}

/// Newline-terminated lines as a one-chunk-per-line body.
pub fn ndjson(lines: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let chunks: Vec<Result<Bytes, std::io::Error>> =
        lines.iter().map(|line| Ok(Bytes::from(format!("{line}\n")))).collect();
    futures_util::stream::iter(chunks)
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub async fn unused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn config_for(base_url: &str) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        ollama_base_url: base_url.to_string(),
        connect_timeout: Duration::from_secs(2),
        idle_timeout: Duration::from_secs(10),
        ..AppConfig::default()
    })
}

/// Sets its flag when dropped; lets a test observe that a stub's response body was released.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Never-ending `tick` lines every 20ms; `closed` flips once the body is dropped.
pub fn endless_ticks(closed: Arc<AtomicBool>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let guard = DropFlag(closed);
    async_stream::stream! {
        let _guard = guard;
        loop {
            yield Ok::<Bytes, std::io::Error>(Bytes::from_static(b"{\"response\":\"tick\"}\n"));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Waits up to 5s for `flag` to be set.
pub async fn wait_for(flag: &AtomicBool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("flag should be set within 5s");
}
