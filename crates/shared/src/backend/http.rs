use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::gateway::{ChatBackend, ChatBackendError, ChatBackendFuture};
use crate::config::ConfigError;
use crate::models::{CHAT_PATH, ChatRequest, ChatResponse, HEALTH_PATH, HealthResponse};

const REQUEST_ID_HEADER: &str = "x-request-id";
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpChatBackendConfig {
    pub base_url: String,
    /// `None` leaves the request unbounded.
    pub request_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
}

impl HttpChatBackend {
    pub fn new(config: HttpChatBackendConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            chat_url: format!("{base_url}{CHAT_PATH}"),
            health_url: format!("{base_url}{HEALTH_PATH}"),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        request_id: &str,
    ) -> Result<T, ChatBackendError> {
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            ChatBackendError::InvalidPayload(format!("response_body_read_failed: {err}"))
        })?;

        if !status.is_success() {
            debug!(request_id, status = status.as_u16(), "chat backend rejected request");
            return Err(ChatBackendError::Status {
                status: status.as_u16(),
                body_excerpt: excerpt(&body),
            });
        }

        serde_json::from_str::<T>(&body).map_err(|err| {
            ChatBackendError::InvalidPayload(format!("response_json_parse_failed: {err}"))
        })
    }
}

impl ChatBackend for HttpChatBackend {
    fn send_chat<'a>(&'a self, request: ChatRequest) -> ChatBackendFuture<'a, ChatResponse> {
        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            debug!(
                request_id = %request_id,
                history_len = request.history.len(),
                "posting chat query"
            );

            let response = self
                .client
                .post(&self.chat_url)
                .header(REQUEST_ID_HEADER, &request_id)
                .json(&request)
                .send()
                .await
                .map_err(map_send_error)?;

            self.read_json(response, &request_id).await
        })
    }

    fn health<'a>(&'a self) -> ChatBackendFuture<'a, HealthResponse> {
        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response = self
                .client
                .get(&self.health_url)
                .header(REQUEST_ID_HEADER, &request_id)
                .send()
                .await
                .map_err(map_send_error)?;

            self.read_json(response, &request_id).await
        })
    }
}

fn map_send_error(err: reqwest::Error) -> ChatBackendError {
    if err.is_timeout() {
        ChatBackendError::Timeout
    } else {
        ChatBackendError::Transport(err.to_string())
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
