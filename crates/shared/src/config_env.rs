use crate::config::ConfigError;

/// Key/value source for configuration. The process environment in
/// production, a map in tests.
pub(crate) trait EnvLookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub(crate) fn parse_u64_env(
    env: &impl EnvLookup,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match optional_trimmed_env(env, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_optional_u64_env(
    env: &impl EnvLookup,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    optional_trimmed_env(env, key)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| ConfigError::ParseInt(key.to_string()))
        })
        .transpose()
}

pub(crate) fn optional_trimmed_env(env: &impl EnvLookup, key: &str) -> Option<String> {
    env.get(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn string_env_or(env: &impl EnvLookup, key: &str, default: &str) -> String {
    optional_trimmed_env(env, key).unwrap_or_else(|| default.to_string())
}
