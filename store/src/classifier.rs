//! Error classification.
//!
//! [`classify`] is total: every [`TransportFailure`] maps to exactly one
//! [`ErrorEnvelope`] kind and nothing here can panic. A failure becomes a
//! [`ValidationError`] only when *all* of these hold:
//!
//! 1. the HTTP status is 400
//! 2. the response declared a JSON content type
//!    (`application/json` or any `+json` suffix)
//! 3. the body parses as a [`ProblemDetail`]
//!
//! Anything else is a [`CriticalError`].

use crate::error::{
    CriticalError, ErrorEnvelope, FieldError, ProblemDetail, TransportFailure, ValidationError,
};

/// HTTP status that selects validation handling
pub const VALIDATION_STATUS: u16 = 400;

/// Classify a transport failure
#[must_use]
pub fn classify(failure: &TransportFailure) -> ErrorEnvelope {
    match failure {
        TransportFailure::Http {
            status,
            content_type,
            body,
        } => {
            let problem = content_type
                .as_deref()
                .filter(|content_type| is_json(content_type))
                .and_then(|_| parse_problem(body));

            match problem {
                Some(problem) if *status == VALIDATION_STATUS => {
                    ErrorEnvelope::Validation(validation_error(problem))
                },
                Some(problem) => ErrorEnvelope::Critical(CriticalError {
                    status: Some(*status),
                    message: problem.detail.or(problem.title),
                }),
                None => ErrorEnvelope::Critical(CriticalError {
                    status: Some(*status),
                    message: None,
                }),
            }
        },
        TransportFailure::Network { message } => ErrorEnvelope::Critical(CriticalError {
            status: None,
            message: Some(message.clone()).filter(|message| !message.is_empty()),
        }),
    }
}

fn validation_error(problem: ProblemDetail) -> ValidationError {
    let field_errors = problem
        .errors
        .unwrap_or_default()
        .into_iter()
        .map(|violation| FieldError {
            field: violation.field,
            message: violation.message,
        })
        .collect();

    ValidationError {
        status: VALIDATION_STATUS,
        title: problem.title,
        detail: problem.detail,
        field_errors,
    }
}

/// Only JSON objects count; `"oops"` or `[1]` are malformed problem bodies
fn parse_problem(body: &str) -> Option<ProblemDetail> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
