use std::time::Duration;

use crate::error::ClientError;

pub const ENV_API_URL: &str = "WAYPOINT_API_URL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "WAYPOINT_HTTP_TIMEOUT_MS";

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how the backend is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_API_URL) {
            Some(url) => Self::new(url),
            None => Self::default(),
        };

        if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
            return Err(ClientError::InvalidConfig {
                key: ENV_API_URL,
                value: config.api_url,
                reason: "must be an http(s) URL".to_string(),
            });
        }

        if let Some(value) = lookup(ENV_HTTP_TIMEOUT_MS) {
            let millis: u64 = value
                .trim()
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ClientError::InvalidConfig {
                    key: ENV_HTTP_TIMEOUT_MS,
                    value: value.clone(),
                    reason: "must be a positive number of milliseconds".to_string(),
                })?;
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}
