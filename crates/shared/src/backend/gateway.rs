use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::models::{ChatRequest, ChatResponse, HealthResponse};

pub type ChatBackendFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ChatBackendError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ChatBackendError {
    #[error("chat backend request timed out")]
    Timeout,
    #[error("chat backend unavailable: {0}")]
    Transport(String),
    #[error("chat backend returned status={status}")]
    Status { status: u16, body_excerpt: String },
    #[error("chat backend returned an invalid payload: {0}")]
    InvalidPayload(String),
}

impl ChatBackendError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::InvalidPayload(_) => "invalid_payload",
        }
    }
}

/// The remote plan/execute/verify service, seen from the client.
pub trait ChatBackend: Send + Sync {
    fn send_chat<'a>(&'a self, request: ChatRequest) -> ChatBackendFuture<'a, ChatResponse>;

    fn health<'a>(&'a self) -> ChatBackendFuture<'a, HealthResponse>;
}
