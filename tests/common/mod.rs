#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use artifact_probe::Backoff;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

#[derive(Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: String,
    headers: Vec<(header::HeaderName, String)>,
    delay: Duration,
}

impl MockResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self::new(status, "")
    }

    pub fn with_header(mut self, name: header::HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What the mock server saw for one request.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    fallback: MockResponse,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(Recorded {
            method,
            path: uri.path().to_owned(),
            headers,
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| state.fallback.clone())
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let mut reply = (response.status, response.body).into_response();
    for (name, value) in response.headers {
        reply
            .headers_mut()
            .insert(name, value.parse().expect("mock header value must be valid"));
    }
    reply
}

pub struct TestServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }
}

/// Serves `responses` in order on every path, then `fallback` forever.
pub async fn spawn_server_with_fallback(
    responses: Vec<MockResponse>,
    fallback: MockResponse,
) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        fallback,
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

pub async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    spawn_server_with_fallback(
        responses,
        MockResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "no mock response available"),
    )
    .await
}

/// Address nothing listens on.
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);
    format!("http://{address}")
}

/// Fixed delay that records every delay it hands out.
#[derive(Debug, Default)]
pub struct RecordingBackoff {
    pub delay: Duration,
    pub delays: Vec<Duration>,
}

impl RecordingBackoff {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            delays: Vec::new(),
        }
    }
}

impl Backoff for RecordingBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.delays.push(self.delay);
        Some(self.delay)
    }
}

/// Backoff that is already exhausted.
pub struct StoppedBackoff;

impl Backoff for StoppedBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}
