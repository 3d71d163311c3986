//! Failure shapes: what the transport reports and what callers receive.
//!
//! A [`TransportFailure`] is raw: an HTTP status with whatever body came back,
//! or a network-level failure with no status at all. It is turned into an
//! [`ErrorEnvelope`] exactly once, by [`crate::classifier::classify`], and
//! everything downstream (request trackers, session callers) only ever sees
//! the envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Collection error shown when a critical failure carries no message
pub const CRITICAL_FALLBACK_MESSAGE: &str = "Critical system error";

/// Failure reported by an [`crate::environment::InventoryApi`] implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The server answered with a non-success status
    Http {
        /// HTTP status code
        status: u16,
        /// `Content-Type` header, if present
        content_type: Option<String>,
        /// Raw response body (may be empty)
        body: String,
    },

    /// No HTTP response: connection refused, timeout, undecodable payload
    Network {
        /// Human readable cause
        message: String,
    },
}

impl TransportFailure {
    /// Shorthand for a JSON problem-detail response
    #[must_use]
    pub fn problem(status: u16, problem: &ProblemDetail) -> Self {
        Self::Http {
            status,
            content_type: Some(PROBLEM_JSON.to_string()),
            body: serde_json::to_string(problem).unwrap_or_default(),
        }
    }

    /// Shorthand for a network-level failure
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, .. } => write!(f, "HTTP {status}"),
            Self::Network { message } => write!(f, "network failure: {message}"),
        }
    }
}

/// Media type of RFC 7807 problem documents
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Problem-detail error body returned by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetail {
    /// Problem type URI
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Status as reported in the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Longer explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Request URI the problem occurred on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Per-field violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

/// A single constraint violation inside a [`ProblemDetail`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dot-qualified property path, e.g. `create.dto.name`
    pub field: String,
    /// Violation message
    pub message: String,
}

/// A field-scoped validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Full dot-qualified path as reported by the server
    pub field: String,
    /// Message to show next to the field
    pub message: String,
}

impl FieldError {
    /// Last path segment, used as the form field key
    ///
    /// `create.dto.stockQuantity` becomes `stockQuantity`. Two paths that
    /// only differ before their last segment collide here.
    #[must_use]
    pub fn form_key(&self) -> &str {
        self.field.rsplit('.').next().unwrap_or(&self.field)
    }
}

/// Recoverable, field-scoped rejection (HTTP 400 with a problem document)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Always 400
    pub status: u16,
    /// Problem title
    pub title: Option<String>,
    /// Problem detail
    pub detail: Option<String>,
    /// Violations in server order, full paths retained
    pub field_errors: Vec<FieldError>,
}

impl ValidationError {
    /// Messages keyed by form field (see [`FieldError::form_key`])
    ///
    /// When several paths share a tail segment the first message wins.
    #[must_use]
    pub fn form_errors(&self) -> BTreeMap<&str, &str> {
        let mut errors = BTreeMap::new();
        for error in &self.field_errors {
            errors
                .entry(error.form_key())
                .or_insert(error.message.as_str());
        }
        errors
    }
}

/// Non-recoverable failure surfaced as the collection-level error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalError {
    /// HTTP status, absent for network failures
    pub status: Option<u16>,
    /// Message, if the failure carried one
    pub message: Option<String>,
}

impl CriticalError {
    /// The message, or [`CRITICAL_FALLBACK_MESSAGE`]
    #[must_use]
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(CRITICAL_FALLBACK_MESSAGE)
    }
}

/// Classified failure of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ErrorEnvelope {
    /// User-correctable; never becomes a collection error
    Validation(ValidationError),
    /// Everything else
    Critical(CriticalError),
}

impl ErrorEnvelope {
    /// Whether this is a validation failure
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The validation payload, if any
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            Self::Critical(_) => None,
        }
    }

    /// HTTP status if one was received
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Validation(error) => Some(error.status),
            Self::Critical(error) => error.status,
        }
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(error) => {
                let title = error.title.as_deref().unwrap_or("Validation failed");
                write!(f, "{title} ({} field errors)", error.field_errors.len())
            },
            Self::Critical(error) => f.write_str(error.display_message()),
        }
    }
}

impl std::error::Error for ErrorEnvelope {}
