//! API client configuration.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::time::Duration;

use crate::runtime::Runtime;

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "NEXT_PUBLIC_API_URL";

/// Environment variable overriding the request timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "PORTAL_TIMEOUT_MS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Headers sent with every request. Per-call headers override these.
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Builds the configuration from environment variables, falling back to defaults.
    pub fn from_runtime<R: Runtime + ?Sized>(runtime: &R) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = runtime.env_var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }

        if let Ok(timeout) = runtime.env_var(TIMEOUT_ENV) {
            let ms: u64 = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {:?}", TIMEOUT_ENV, timeout))?;
            config.timeout = Duration::from_millis(ms);
        }

        debug!(
            "API client config: base_url={} timeout={}ms",
            config.base_url,
            config.timeout.as_millis()
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::env::VarError;

    fn runtime_with(url: Option<&str>, timeout: Option<&str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let url = url.map(str::to_string);
        let timeout = timeout.map(str::to_string);

        runtime
            .expect_env_var()
            .with(eq(API_URL_ENV))
            .returning(move |_| url.clone().ok_or(VarError::NotPresent));
        runtime
            .expect_env_var()
            .with(eq(TIMEOUT_ENV))
            .returning(move |_| timeout.clone().ok_or(VarError::NotPresent));

        runtime
    }

    #[test]
    fn test_defaults() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_millis(30000));
        assert_eq!(
            config.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_from_runtime_without_env() {
        let config = ApiClientConfig::from_runtime(&runtime_with(None, None)).unwrap();
        assert_eq!(config, ApiClientConfig::default());
    }

    #[test]
    fn test_from_runtime_with_env() {
        let runtime = runtime_with(Some("https://api.example.com"), Some("5000"));
        let config = ApiClientConfig::from_runtime(&runtime).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_from_runtime_blank_url_uses_default() {
        let config = ApiClientConfig::from_runtime(&runtime_with(Some("  "), None)).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_from_runtime_invalid_timeout() {
        let result = ApiClientConfig::from_runtime(&runtime_with(None, Some("soon")));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains(TIMEOUT_ENV));
    }

    #[test]
    fn test_builder_methods() {
        let config = ApiClientConfig::new("http://api")
            .with_timeout(Duration::from_millis(10))
            .with_header("X-Partner", "p1");
        assert_eq!(config.base_url, "http://api");
        assert_eq!(config.timeout, Duration::from_millis(10));
        assert_eq!(config.headers.len(), 2);
    }
}
