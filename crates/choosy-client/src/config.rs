use std::time::Duration;

use choosy_core::{DEFAULT_NAMESPACE, DEFAULT_TOKEN_PATH};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_path: default_token_path(),
            client_id: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            namespace: default_namespace(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Joins `path` onto the base URL. Absolute URLs are passed through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn is_token_path(&self, path: &str) -> bool {
        normalize_path(path) == normalize_path(&self.token_path)
    }
}

/// Fixed-delay retry budget. The delay does not grow between attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_matches('/')
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_minimal_json() -> Result<(), serde_json::Error> {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url":"https://api.test"}"#)?;
        assert_eq!(config, ClientConfig::new("https://api.test"));
        assert_eq!(config.retry.attempts(), 3);
        assert_eq!(config.retry.delay(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn url_for_joins_single_slash() {
        let config = ClientConfig::new("https://api.test/");
        assert_eq!(config.url_for("/api/recipes"), "https://api.test/api/recipes");
        assert_eq!(config.url_for("api/recipes"), "https://api.test/api/recipes");
        assert_eq!(config.url_for("http://other/x"), "http://other/x");
    }

    #[test]
    fn token_path_matches_ignoring_slashes_and_query() {
        let config = ClientConfig::new("https://api.test");
        assert!(config.is_token_path("/oauth/token"));
        assert!(config.is_token_path("oauth/token/"));
        assert!(config.is_token_path("/oauth/token?x=1"));
        assert!(!config.is_token_path("/oauth/token/revoke"));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay_ms: 0,
        };
        assert_eq!(policy.attempts(), 1);
    }
}
