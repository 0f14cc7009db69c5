use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::backend::HttpChatBackendConfig;
use crate::chat::{DEFAULT_EXECUTING_DELAY_MS, DEFAULT_VERIFYING_DELAY_MS, ProgressTimings};
use crate::config_env::{
    EnvLookup, optional_trimmed_env, parse_optional_u64_env, parse_u64_env, process_env,
    string_env_or,
};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

const API_BASE_URL_ENV: &str = "ASSISTOPS_API_BASE_URL";
const EXECUTING_DELAY_ENV: &str = "ASSISTOPS_EXECUTING_DELAY_MS";
const VERIFYING_DELAY_ENV: &str = "ASSISTOPS_VERIFYING_DELAY_MS";
const REQUEST_TIMEOUT_ENV: &str = "ASSISTOPS_REQUEST_TIMEOUT_MS";
const LOG_FORMAT_ENV: &str = "ASSISTOPS_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timings: ProgressTimings,
    pub request_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load(&lookup)
    }

    fn load(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let api_base_url = validate_base_url(&string_env_or(
            env,
            API_BASE_URL_ENV,
            DEFAULT_API_BASE_URL,
        ))?;

        let executing_after = parse_u64_env(env, EXECUTING_DELAY_ENV, DEFAULT_EXECUTING_DELAY_MS)?;
        let verifying_after = parse_u64_env(env, VERIFYING_DELAY_ENV, DEFAULT_VERIFYING_DELAY_MS)?;
        if verifying_after < executing_after {
            return Err(ConfigError::InvalidConfiguration(format!(
                "{VERIFYING_DELAY_ENV} ({verifying_after}) must not be less than {EXECUTING_DELAY_ENV} ({executing_after})"
            )));
        }

        let request_timeout = match parse_optional_u64_env(env, REQUEST_TIMEOUT_ENV)? {
            Some(0) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "{REQUEST_TIMEOUT_ENV} must be greater than 0"
                )));
            }
            other => other.map(Duration::from_millis),
        };

        let log_format = match optional_trimmed_env(env, LOG_FORMAT_ENV) {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidConfiguration(format!(
                    "{LOG_FORMAT_ENV} must be 'text' or 'json', got '{raw}'"
                ))
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api_base_url,
            timings: ProgressTimings {
                executing_after: Duration::from_millis(executing_after),
                verifying_after: Duration::from_millis(verifying_after),
            },
            request_timeout,
            log_format,
        })
    }

    /// Replaces the backend origin, e.g. from a command-line flag.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_base_url = validate_base_url(raw)?;
        Ok(self)
    }

    pub fn http_backend_config(&self) -> HttpChatBackendConfig {
        HttpChatBackendConfig {
            base_url: self.api_base_url.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Loads `.env` from the working directory or its parents. A missing file is
/// fine; a malformed one is not.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::InvalidConfiguration(format!(
            "failed to load .env: {err}"
        ))),
    }
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|err| {
        ConfigError::InvalidConfiguration(format!("{API_BASE_URL_ENV} is not a valid URL: {err}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{API_BASE_URL_ENV} must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{API_BASE_URL_ENV} must include a host"
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
