use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::backend::{ChatBackend, ChatBackendError, HttpChatBackend, HttpChatBackendConfig};
use shared::models::{ChatRequest, HistoryMessage, TurnRole};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockReply {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_request_ids: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_request_ids: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn posts_query_and_history_and_parses_envelope() {
    let state = TestServerState::with_replies(vec![MockReply::json(
        StatusCode::OK,
        json!({
            "query": "and tomorrow?",
            "plan": [{"tool": "get_weather", "args": {"city": "Pune"}, "reason": "forecast"}],
            "results": [{
                "step": {"tool": "get_weather", "reason": "forecast"},
                "status": "success",
                "output": {"city": "Pune", "temperature": 31.4, "description": "sunny"}
            }],
            "verified_output": "Sunny and warm in Pune.",
            "status": "success",
            "history": []
        }),
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let backend = backend_for(&url, None);
    let response = backend
        .send_chat(ChatRequest {
            query: "and tomorrow?".to_string(),
            history: vec![
                HistoryMessage {
                    role: TurnRole::User,
                    content: "weather in Pune".to_string(),
                },
                HistoryMessage {
                    role: TurnRole::Assistant,
                    content: "Hot.".to_string(),
                },
            ],
        })
        .await
        .expect("chat should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.verified_output, "Sunny and warm in Pune.");
    assert_eq!(response.results().len(), 1);
    assert_eq!(response.plan.len(), 1);

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(
        seen_bodies,
        vec![json!({
            "query": "and tomorrow?",
            "history": [
                {"role": "user", "content": "weather in Pune"},
                {"role": "assistant", "content": "Hot."}
            ]
        })]
    );
    let seen_request_ids = state.seen_request_ids.lock().await.clone();
    assert_eq!(seen_request_ids.len(), 1);
    assert!(!seen_request_ids[0].is_empty());
}

#[tokio::test]
async fn non_success_status_maps_to_status_error() {
    let state = TestServerState::with_replies(vec![MockReply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"detail": "planner crashed"}),
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let err = backend_for(&url, None)
        .send_chat(simple_request())
        .await
        .expect_err("500 should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    match err {
        ChatBackendError::Status {
            status,
            body_excerpt,
        } => {
            assert_eq!(status, 500);
            assert!(body_excerpt.contains("planner crashed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_maps_to_invalid_payload() {
    let state = TestServerState::with_replies(vec![
        MockReply::raw(StatusCode::OK, "<html>gateway</html>"),
        MockReply::json(StatusCode::OK, json!({"results": []})),
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state).await;
    let backend = backend_for(&url, None);

    let not_json = backend
        .send_chat(simple_request())
        .await
        .expect_err("html should fail");
    let missing_answer = backend
        .send_chat(simple_request())
        .await
        .expect_err("missing verified_output should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(not_json, ChatBackendError::InvalidPayload(_)));
    assert!(matches!(missing_answer, ChatBackendError::InvalidPayload(_)));
}

#[tokio::test]
async fn slow_backend_hits_configured_timeout() {
    let state = TestServerState::with_replies(vec![MockReply {
        delay: Duration::from_millis(500),
        ..MockReply::json(StatusCode::OK, json!({"verified_output": "late"}))
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let err = backend_for(&url, Some(Duration::from_millis(50)))
        .send_chat(simple_request())
        .await
        .expect_err("request should time out");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, ChatBackendError::Timeout));
}

#[tokio::test]
async fn unreachable_backend_maps_to_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    drop(listener);

    let err = backend_for(&format!("http://{local_addr}"), None)
        .send_chat(simple_request())
        .await
        .expect_err("closed port should fail");

    assert!(matches!(err, ChatBackendError::Transport(_)));
}

#[tokio::test]
async fn health_probe_reads_root_message() {
    let state = TestServerState::with_replies(Vec::new());
    let (url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let health = backend_for(&url, None)
        .health()
        .await
        .expect("health should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(health.message, "AssistOps backend is running");
}

fn backend_for(base_url: &str, request_timeout: Option<Duration>) -> HttpChatBackend {
    HttpChatBackend::new(HttpChatBackendConfig {
        base_url: base_url.to_string(),
        request_timeout,
    })
    .expect("backend should build")
}

fn simple_request() -> ChatRequest {
    ChatRequest {
        query: "weather in Pune".to_string(),
        history: Vec::new(),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/", get(test_health_handler))
        .route("/api/chat", post(test_chat_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn test_health_handler() -> Json<Value> {
    Json(json!({"message": "AssistOps backend is running"}))
}

async fn test_chat_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    state.seen_bodies.lock().await.push(payload);

    if let Some(value) = headers
        .get("x-request-id")
        .and_then(|header| header.to_str().ok())
    {
        state.seen_request_ids.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"detail": "exhausted_test_replies"}),
    ));
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (
        reply.status,
        [(CONTENT_TYPE, "application/json")],
        reply.body,
    )
}
