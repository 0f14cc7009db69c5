#![allow(dead_code)]

pub mod backend_mock;

use std::time::Duration;

use serde_json::{Value, json};
use shared::backend::{HttpChatBackend, HttpChatBackendConfig};
use shared::chat::{ProgressTimings, RequestController};

/// Short stage delays so timer-driven tests run in real time.
pub const FAST_TIMINGS: ProgressTimings = ProgressTimings {
    executing_after: Duration::from_millis(30),
    verifying_after: Duration::from_millis(80),
};

pub fn controller_for(base_url: &str) -> RequestController<HttpChatBackend> {
    let backend = HttpChatBackend::new(HttpChatBackendConfig {
        base_url: base_url.to_string(),
        request_timeout: None,
    })
    .expect("http backend should build");
    RequestController::new(backend, FAST_TIMINGS)
}

pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should become true");
}

pub fn mumbai_weather_envelope() -> Value {
    json!({
        "query": "Weather advice for a night in Mumbai",
        "plan": [{"tool": "get_weather", "args": {"city": "Mumbai"}, "reason": "Need tonight's conditions"}],
        "results": [{
            "step": {"tool": "get_weather", "reason": "Need tonight's conditions"},
            "status": "success",
            "output": {
                "city": "Mumbai",
                "temperature": 29,
                "humidity": 70,
                "wind_speed": 12,
                "description": "clear sky"
            }
        }],
        "verified_output": "Clear skies and 29°C tonight. Light cotton clothing is a good call.",
        "status": "success",
        "history": []
    })
}
