use std::time::Duration;

pub const BASE_URL_ENV_VAR: &str = "CHATLINE_BACKEND_BASE_URL";
pub const API_KEY_ENV_VAR: &str = "CHATLINE_BACKEND_API_KEY";
pub const STREAM_IDLE_TIMEOUT_ENV_VAR: &str = "CHATLINE_STREAM_IDLE_TIMEOUT_MS";

pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for the conversation service.
///
/// Read once at startup and handed to constructors. A missing base URL is
/// not an error: callers fall back to the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub stream_idle_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never have to
    /// touch the process environment. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let stream_idle_timeout = read(STREAM_IDLE_TIMEOUT_ENV_VAR)
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(err) => {
                    tracing::warn!(
                        "ignoring invalid {STREAM_IDLE_TIMEOUT_ENV_VAR}={raw:?}: {err}"
                    );
                    None
                }
            })
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT);

        Self {
            base_url: read(BASE_URL_ENV_VAR).map(|url| url.trim_end_matches('/').to_string()),
            api_key: read(API_KEY_ENV_VAR),
            stream_idle_timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn is_remote(&self) -> bool {
        self.base_url.is_some()
    }
}
