use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const TOOL_GET_WEATHER: &str = "get_weather";
pub const TOOL_SEARCH_REPOSITORIES: &str = "search_repositories";
pub const TOOL_GET_REPO_DETAILS: &str = "get_repo_details";
pub const TOOL_LIST_USER_REPOSITORIES: &str = "list_user_repositories";

/// Tool identifier as declared by a plan step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Weather,
    SearchRepositories,
    RepoDetails,
    ListUserRepositories,
    Unknown(String),
}

impl ToolKind {
    pub fn from_id(id: &str) -> Self {
        match id {
            TOOL_GET_WEATHER => Self::Weather,
            TOOL_SEARCH_REPOSITORIES => Self::SearchRepositories,
            TOOL_GET_REPO_DETAILS => Self::RepoDetails,
            TOOL_LIST_USER_REPOSITORIES => Self::ListUserRepositories,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Weather => TOOL_GET_WEATHER,
            Self::SearchRepositories => TOOL_SEARCH_REPOSITORIES,
            Self::RepoDetails => TOOL_GET_REPO_DETAILS,
            Self::ListUserRepositories => TOOL_LIST_USER_REPOSITORIES,
            Self::Unknown(id) => id.as_str(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Decoded output of one tool step.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Weather(WeatherReport),
    RepositoryList(RepositoryList),
    RepositoryDetails(RepositoryDetails),
    /// Unknown tool, a tool that reported its own failure, or an output that
    /// lacks the fields its tool promises. Kept raw, never rendered as a card.
    Unparsed { tool: ToolKind, raw: Value },
}

impl ToolOutput {
    pub fn decode(tool: ToolKind, raw: &Value) -> Self {
        if reports_failure(raw) {
            return Self::Unparsed {
                tool,
                raw: raw.clone(),
            };
        }

        let decoded = match tool {
            ToolKind::Weather => decode_as(raw).map(Self::Weather),
            ToolKind::SearchRepositories | ToolKind::ListUserRepositories => {
                decode_as(raw).map(Self::RepositoryList)
            }
            ToolKind::RepoDetails => decode_as(raw).map(Self::RepositoryDetails),
            ToolKind::Unknown(_) => None,
        };

        decoded.unwrap_or_else(|| Self::Unparsed {
            tool,
            raw: raw.clone(),
        })
    }

    pub fn is_renderable(&self) -> bool {
        !matches!(self, Self::Unparsed { .. })
    }

    pub fn as_weather(&self) -> Option<&WeatherReport> {
        match self {
            Self::Weather(report) => Some(report),
            _ => None,
        }
    }
}

fn decode_as<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    serde_json::from_value(raw.clone()).ok()
}

fn reports_failure(raw: &Value) -> bool {
    raw.get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("failed"))
}

pub const WEATHER_FALLBACK_LABEL: &str = "Current Condition";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub temperature: f64,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

impl WeatherReport {
    pub fn label(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .unwrap_or(WEATHER_FALLBACK_LABEL)
    }

    pub fn rounded_temperature(&self) -> i64 {
        self.temperature.round() as i64
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_description(self.description.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Rain,
    Clear,
    Storm,
    Cloudy,
}

impl WeatherCondition {
    pub fn from_description(description: &str) -> Self {
        let description = description.to_lowercase();
        if description.contains("rain") {
            Self::Rain
        } else if description.contains("clear") || description.contains("sun") {
            Self::Clear
        } else if description.contains("storm") || description.contains("bolt") {
            Self::Storm
        } else {
            Self::Cloudy
        }
    }

    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Rain => "🌧",
            Self::Clear => "☀",
            Self::Storm => "⛈",
            Self::Cloudy => "☁",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryList {
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositorySummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_fork: Option<bool>,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryDetails {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: Option<u64>,
    #[serde(default)]
    pub forks: Option<u64>,
    #[serde(default)]
    pub is_fork: Option<bool>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub parent: Option<RepositoryParent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepositoryParent {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
