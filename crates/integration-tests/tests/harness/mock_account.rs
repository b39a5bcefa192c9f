//! Mock upstream account for integration tests
//!
//! Serves an OpenAI-shaped `/v1/models` listing and answers completions with
//! scripted statuses, plain JSON, or a streamed SSE body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::stream;
use tokio_util::sync::CancellationToken;

/// Mock upstream account with request counters
pub struct MockAccount {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    name: String,
    models: Vec<String>,
    hits: AtomicU32,
    /// Requests still to fail before succeeding
    fail_remaining: AtomicU32,
    fail_status: StatusCode,
    last_body: Mutex<Option<serde_json::Value>>,
    last_headers: Mutex<Option<HeaderMap>>,
}

impl MockAccount {
    /// Start an account that always succeeds
    pub async fn start(name: &str, models: &[&str]) -> anyhow::Result<Self> {
        Self::start_inner(name, models, 0, StatusCode::OK).await
    }

    /// Start an account that answers every completion with `status`
    pub async fn start_failing(name: &str, models: &[&str], status: u16) -> anyhow::Result<Self> {
        Self::start_inner(name, models, u32::MAX, StatusCode::from_u16(status)?).await
    }

    /// Start an account that fails the first `n` completions with 500
    pub async fn start_failing_first(name: &str, models: &[&str], n: u32) -> anyhow::Result<Self> {
        Self::start_inner(name, models, n, StatusCode::INTERNAL_SERVER_ERROR).await
    }

    async fn start_inner(name: &str, models: &[&str], fail: u32, fail_status: StatusCode) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            name: name.to_owned(),
            models: models.iter().map(|m| (*m).to_owned()).collect(),
            hits: AtomicU32::new(0),
            fail_remaining: AtomicU32::new(fail),
            fail_status,
            last_body: Mutex::new(None),
            last_headers: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/models", routing::get(handle_models))
            .route("/v1/chat/completions", routing::post(handle_completion))
            .route("/v1/messages", routing::post(handle_completion))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Bare host URL; the gateway adds `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Completion requests received
    pub fn hits(&self) -> u32 {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// JSON body of the most recent completion request
    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    /// Headers of the most recent completion request
    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.state.last_headers.lock().unwrap().clone()
    }
}

impl Drop for MockAccount {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_models(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    let data: Vec<_> = state
        .models
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "object": "model",
                "created": 1_700_000_000,
                "owned_by": "upstream",
            })
        })
        .collect();

    Json(serde_json::json!({ "object": "list", "data": data }))
}

async fn handle_completion(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = Some(body.clone());
    *state.last_headers.lock().unwrap() = Some(headers);

    let failing = state
        .fail_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();

    if failing {
        return (
            state.fail_status,
            [("x-mock-account", state.name.clone())],
            Json(serde_json::json!({
                "error": {
                    "message": format!("mock {} failure", state.name),
                    "type": "server_error"
                }
            })),
        )
            .into_response();
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();

    if body["stream"].as_bool().unwrap_or(false) {
        return streaming_response(&state.name, &model);
    }

    (
        [("x-mock-account", state.name.clone())],
        Json(serde_json::json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": format!("hello from {}", state.name)},
                "finish_reason": "stop"
            }]
        })),
    )
        .into_response()
}

/// SSE body delivered in separate chunks with small pauses between them
fn streaming_response(name: &str, model: &str) -> Response {
    let mut events: Vec<String> = ["Hel", "lo ", "from ", name]
        .iter()
        .map(|piece| {
            let chunk = serde_json::json!({
                "object": "chat.completion.chunk",
                "model": model,
                "choices": [{"index": 0, "delta": {"content": piece}}]
            });
            format!("data: {chunk}\n\n")
        })
        .collect();
    events.push("data: [DONE]\n\n".to_owned());

    let body = stream::unfold(events.into_iter(), |mut events| async move {
        let event = events.next()?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some((Ok::<_, Infallible>(Bytes::from(event)), events))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-mock-account", name)
        .body(Body::from_stream(body))
        .unwrap()
}
