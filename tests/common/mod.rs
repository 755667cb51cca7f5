#![allow(dead_code)]

use async_stream::stream;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures::future::join_all;
use llm_explorer::{
    BackendSpec, FanoutCoordinator, GatingPolicy, InferenceClient, Outcome, RateLimiter,
    Submission,
};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// OpenAI-style streaming backend; behaviour is picked by the `model` field.
#[derive(Clone, Default)]
pub struct MockBackend {
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

fn chunk(content: &str) -> String {
    json!({ "choices": [{ "index": 0, "delta": { "content": content } }] }).to_string()
}

fn sse(chunks: Vec<String>, delay: Duration) -> Response {
    let events = stream! {
        for data in chunks {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            yield Ok::<_, Infallible>(Event::default().data(data));
        }
    };
    Sse::new(events).into_response()
}

async fn completions(
    State(mock): State<MockBackend>,
    uri: Uri,
    headers: HeaderMap,
    Json(params): Json<Value>,
) -> Response {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    mock.paths.lock().unwrap().push(uri.path().to_string());

    let done = "[DONE]".to_string();
    match params["model"].as_str().unwrap_or_default() {
        "mock/hello" => sse(
            vec![chunk("Hello"), chunk(", "), chunk("world!"), done],
            Duration::ZERO,
        ),
        "mock/fail" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "mock/broken" => sse(
            vec![chunk("partial"), "not json".to_string()],
            Duration::ZERO,
        ),
        "mock/slow" => {
            let mut chunks: Vec<String> = (0..10).map(|i| chunk(&format!("{i} "))).collect();
            chunks.push(done);
            sse(chunks, Duration::from_millis(50))
        }
        "mock/echo-auth" => {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string();
            let max_tokens = params["max_tokens"].to_string();
            let system = params["messages"][0]["role"].as_str().unwrap_or_default().to_string();
            sse(
                vec![chunk(&auth), chunk(&format!("|{max_tokens}|{system}")), done],
                Duration::ZERO,
            )
        }
        other => (StatusCode::NOT_FOUND, format!("unknown model {other}")).into_response(),
    }
}

/// Serve the mock on an ephemeral port, returning its base url.
pub async fn spawn_mock() -> (String, MockBackend) {
    let mock = MockBackend::default();
    let router = Router::new().fallback(completions).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (base, mock)
}

pub fn backend(model: &str) -> BackendSpec {
    BackendSpec::new(model, format!("{model} pane"))
}

pub fn coordinator(
    base: &str,
    models: &[&str],
    limiter: Arc<RateLimiter>,
    gating: GatingPolicy,
    default_token: Option<&str>,
) -> FanoutCoordinator {
    let client = InferenceClient::new(
        base,
        default_token.map(str::to_string),
        Duration::from_secs(10),
    )
    .unwrap();
    FanoutCoordinator::new(
        client,
        limiter,
        models.iter().map(|m| backend(m)).collect(),
        gating,
    )
}

pub async fn settle_all(submission: Submission) -> Vec<Outcome> {
    join_all(submission.destinations.into_iter().map(|d| d.settle())).await
}
