//! Error types for the webhook processor.
//!
//! Must-succeed stages return [`Critical`] and bubble into a `500`.
//! Best-effort stages return [`Degradable`], which logs its failure and hands
//! back nothing instead of an error.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors that end a webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Any method other than POST/OPTIONS.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Declared or actual body size above the cap.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Missing or wrong shared secret, or no secret configured.
    #[error("Unauthorized")]
    Unauthorized,

    /// Body is not JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON does not have the expected structure.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Storage failure in a must-succeed stage.
    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
            }
            WebhookError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"),
            WebhookError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            WebhookError::InvalidJson(err) => {
                tracing::warn!(error = %err, "Rejected malformed JSON body");
                (StatusCode::BAD_REQUEST, "Invalid JSON")
            }
            WebhookError::InvalidPayload(err) => {
                tracing::warn!(error = %err, "Rejected invalid payload");
                (StatusCode::BAD_REQUEST, "Invalid payload")
            }
            WebhookError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            WebhookError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Outcome of a stage whose failure aborts the request.
pub type Critical<T> = std::result::Result<T, WebhookError>;

/// Outcome of a best-effort stage: a value, or nothing after a logged warning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Degradable<T>(Option<T>);

impl<T> Degradable<T> {
    /// Wrap a successful value.
    pub fn ok(value: T) -> Self {
        Self(Some(value))
    }

    /// Record a skipped stage.
    pub fn skipped(stage: &'static str, reason: impl Display) -> Self {
        tracing::warn!(stage, reason = %reason, "Best-effort stage skipped");
        Self(None)
    }

    /// Absorb a fallible result, logging the error instead of returning it.
    pub fn from_result<E: Display>(stage: &'static str, result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::skipped(stage, err),
        }
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    pub fn into_option(self) -> Option<T> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_absorbs_errors() {
        let ok: Degradable<u8> = Degradable::from_result("test", Ok::<_, String>(3));
        assert_eq!(ok.into_option(), Some(3));

        let failed: Degradable<u8> = Degradable::from_result("test", Err("boom"));
        assert!(!failed.is_some());
        assert_eq!(failed.into_option(), None);
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (WebhookError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
            (WebhookError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (WebhookError::Unauthorized, StatusCode::UNAUTHORIZED),
            (WebhookError::InvalidJson("x".into()), StatusCode::BAD_REQUEST),
            (WebhookError::InvalidPayload("x".into()), StatusCode::BAD_REQUEST),
            (
                WebhookError::Internal("secret detail".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
