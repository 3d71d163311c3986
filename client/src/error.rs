//! Error types for the HTTP client

use thiserror::Error;

/// Errors that can occur while setting up the HTTP client
#[derive(Debug, Error)]
pub enum ClientError {
    /// A variable holds a value that cannot be parsed
    #[error("Invalid value for {var}: {value:?}")]
    InvalidConfig {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// The base URL is empty or not http(s)
    #[error("Invalid base URL: {0:?}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be built
    #[error("HTTP client construction failed: {0}")]
    Build(#[from] reqwest::Error),
}
