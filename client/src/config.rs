//! HTTP client configuration.

use crate::error::ClientError;
use std::time::Duration;

/// Base URL of the inventory server
pub const API_URL_VAR: &str = "INVENTORY_API_URL";
/// Per-request timeout in seconds
pub const HTTP_TIMEOUT_VAR: &str = "INVENTORY_HTTP_TIMEOUT_SECS";

/// Server used when [`API_URL_VAR`] is unset
pub const DEFAULT_API_URL: &str = "http://localhost:8081";
/// Timeout used when [`HTTP_TIMEOUT_VAR`] is unset
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the inventory server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Bound on a single request, surfaced as a network failure
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Config for an explicit base URL
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] unless `base_url` is an http(s) URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let config = Self {
            base_url: normalize(base_url.into()),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            config.base_url = normalize(url);
        }

        if let Some(value) = lookup(HTTP_TIMEOUT_VAR) {
            let secs: u64 = value
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ClientError::InvalidConfig {
                    var: HTTP_TIMEOUT_VAR,
                    value: value.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the base URL
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] unless the URL is http(s).
    pub fn validate(&self) -> Result<(), ClientError> {
        let scheme_ok = self.base_url.starts_with("http://") || self.base_url.starts_with("https://");
        if !scheme_ok || self.base_url.ends_with("//") {
            return Err(ClientError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

fn normalize(url: String) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
