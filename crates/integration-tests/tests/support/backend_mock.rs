#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode, header::CONTENT_TYPE};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone)]
pub struct MockChatReply {
    status: StatusCode,
    body: String,
    gate: Option<Arc<Notify>>,
}

impl MockChatReply {
    pub fn ok(body: Value) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            gate: None,
        }
    }

    pub fn raw(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            gate: None,
        }
    }

    /// Holds the reply until `gate` is notified.
    pub fn held_by(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<MockChatReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_request_ids: Arc<Mutex<Vec<String>>>,
}

pub struct MockChatServer {
    pub base_url: String,
    state: MockState,
    handle: tokio::task::JoinHandle<()>,
}

impl MockChatServer {
    pub async fn start(replies: Vec<MockChatReply>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..MockState::default()
        };
        let app = Router::new()
            .route("/", get(health_handler))
            .route("/api/chat", post(chat_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock chat listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("mock chat listener local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock chat server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            state,
            handle,
        }
    }

    pub async fn seen_bodies(&self) -> Vec<Value> {
        self.state.seen_bodies.lock().await.clone()
    }

    pub async fn seen_request_ids(&self) -> Vec<String> {
        self.state.seen_request_ids.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.seen_bodies.lock().await.len()
    }

    /// Waits until the server has received `count` chat requests.
    pub async fn wait_for_requests(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.request_count().await < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("mock chat server should receive the expected requests");
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({"message": "AssistOps backend is running"}))
}

async fn chat_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, [(HeaderName, &'static str); 1], String) {
    state.seen_bodies.lock().await.push(payload);
    if let Some(value) = headers
        .get("x-request-id")
        .and_then(|header| header.to_str().ok())
    {
        state.seen_request_ids.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockChatReply::status(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"detail": "exhausted_test_replies"}),
    ));
    if let Some(gate) = &reply.gate {
        gate.notified().await;
    }

    (
        reply.status,
        [(CONTENT_TYPE, "application/json")],
        reply.body,
    )
}
