use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const CHAT_PATH: &str = "/api/chat";
pub const HEALTH_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior turn as sent back to the backend. Structured payloads never
/// travel outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStatus {
    Success,
    NoPlan,
    Other(String),
}

impl From<String> for ResponseStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => Self::Success,
            "no_plan" => Self::NoPlan,
            _ => Self::Other(value),
        }
    }
}

impl From<ResponseStatus> for String {
    fn from(value: ResponseStatus) -> Self {
        match value {
            ResponseStatus::Success => "success".to_string(),
            ResponseStatus::NoPlan => "no_plan".to_string(),
            ResponseStatus::Other(raw) => raw,
        }
    }
}

/// Body of a successful `POST /api/chat`.
///
/// Only `verified_output` is required. Everything else is display material and
/// defaults when missing or `null`, so a partially populated body still
/// completes the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub verified_output: String,
    #[serde(default)]
    pub results: Option<Vec<StepResult>>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan: Vec<PlannedStep>,
    #[serde(default, deserialize_with = "lenient_response_status")]
    pub status: Option<ResponseStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryMessage>,
}

impl ChatResponse {
    pub fn results(&self) -> &[StepResult] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn planner_found_no_steps(&self) -> bool {
        matches!(self.status, Some(ResponseStatus::NoPlan))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannedStep {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tool: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tool: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Success,
    Failed,
    #[default]
    Unknown,
    Other(String),
}

impl StepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Success => "SUCCESS".to_string(),
            Self::Failed => "FAILED".to_string(),
            Self::Unknown => "UNKNOWN".to_string(),
            Self::Other(raw) => raw.to_uppercase(),
        }
    }
}

impl From<String> for StepStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "" => Self::Unknown,
            _ => Self::Other(value),
        }
    }
}

impl From<StepStatus> for String {
    fn from(value: StepStatus) -> Self {
        match value {
            StepStatus::Success => "success".to_string(),
            StepStatus::Failed => "failed".to_string(),
            StepStatus::Unknown => String::new(),
            StepStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One tool invocation inside an envelope. A step either produced `output` or
/// an `error`; a missing `output` is simply absent, never a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub step: StepDescriptor,
    #[serde(default, deserialize_with = "lenient_step_status")]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl StepResult {
    /// `output` with JSON `null` treated the same as a missing field.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref().filter(|value| !value.is_null())
    }
}

// Planner fields are untyped model output; `null` or a stray number must not
// fail the envelope.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_string(deserializer).map(Option::unwrap_or_default)
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_step_status<'de, D>(deserializer: D) -> Result<StepStatus, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(StepStatus::from)
}

fn lenient_response_status<'de, D>(deserializer: D) -> Result<Option<ResponseStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_string(deserializer).map(|raw| raw.map(ResponseStatus::from))
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub message: String,
}
