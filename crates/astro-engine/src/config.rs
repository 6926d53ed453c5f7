use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "ASTRO_ENHANCER_API_URL";

/// Where the enhancement service lives and how long to wait for it.
///
/// Requests are unbounded unless a caller sets `request_timeout` through
/// [`ServiceConfig::with_timeout`]; enhancement calls routinely run for tens
/// of seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_base: String,
    pub request_timeout: Option<Duration>,
}

impl ServiceConfig {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: normalize_api_base(api_base).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            request_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Explicit override, then environment, then the built-in default.
    pub fn from_env(override_url: Option<&str>) -> Self {
        Self::resolve(override_url, non_empty_env(API_URL_ENV))
    }

    pub fn resolve(override_url: Option<&str>, env_url: Option<String>) -> Self {
        let api_base = override_url
            .and_then(normalize_api_base)
            .or_else(|| env_url.as_deref().and_then(normalize_api_base))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            api_base,
            request_timeout: None,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn normalize_api_base(raw: &str) -> Option<String> {
    let value = raw.trim().trim_end_matches('/');
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
