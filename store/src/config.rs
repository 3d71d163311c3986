//! Engine settings.
//!
//! # Example
//!
//! ```no_run
//! use inventory_sync_store::config::SyncSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // INVENTORY_RESOLUTION, INVENTORY_STALENESS, INVENTORY_WAIT_TIMEOUT_MS
//! let settings = SyncSettings::from_env()?;
//! println!("resolution: {}", settings.resolution);
//! # Ok(())
//! # }
//! ```

use crate::lifecycle::ResolutionPolicy;
use crate::reconciler::StalenessPolicy;
use std::time::Duration;
use thiserror::Error;

/// Selects the [`ResolutionPolicy`]
pub const RESOLUTION_VAR: &str = "INVENTORY_RESOLUTION";
/// Selects the [`StalenessPolicy`]
pub const STALENESS_VAR: &str = "INVENTORY_STALENESS";
/// Caller wait timeout in milliseconds; unset or `0` waits indefinitely
pub const WAIT_TIMEOUT_VAR: &str = "INVENTORY_WAIT_TIMEOUT_MS";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed
    #[error("Invalid value for {var}: {value:?} (expected {expected})")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
        /// Accepted values
        expected: &'static str,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Settings of the synchronization engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSettings {
    /// How out-of-order resolutions are handled
    pub resolution: ResolutionPolicy,
    /// What happens to loaded products when a referenced raw material is deleted
    pub staleness: StalenessPolicy,
    /// Bound on how long a session caller waits for a resolution
    ///
    /// Only the caller's wait is bounded: the operation keeps running and its
    /// resolution is still applied when it arrives.
    pub wait_timeout: Option<Duration>,
}

impl SyncSettings {
    /// Set the resolution policy
    #[must_use]
    pub const fn with_resolution(mut self, resolution: ResolutionPolicy) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the staleness policy
    #[must_use]
    pub const fn with_staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    /// Bound the caller wait
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Load settings from the process environment
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(RESOLUTION_VAR) {
            settings.resolution = value.parse().map_err(|value| ConfigError::InvalidValue {
                var: RESOLUTION_VAR,
                value,
                expected: "last-resumed-wins | last-issued-wins",
            })?;
        }

        if let Some(value) = lookup(STALENESS_VAR) {
            settings.staleness = value.parse().map_err(|value| ConfigError::InvalidValue {
                var: STALENESS_VAR,
                value,
                expected: "retain | refetch-products",
            })?;
        }

        if let Some(value) = lookup(WAIT_TIMEOUT_VAR) {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: WAIT_TIMEOUT_VAR,
                value: value.clone(),
                expected: "milliseconds as an unsigned integer",
            })?;
            settings.wait_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        settings.validate()?;
        tracing::debug!(
            resolution = %settings.resolution,
            staleness = %settings.staleness,
            wait_timeout = ?settings.wait_timeout,
            "Loaded sync settings"
        );
        Ok(settings)
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns error if the wait timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ValidationError(
                "wait_timeout must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}
