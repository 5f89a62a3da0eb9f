//! Shared-secret authentication for webhook deliveries.

use axum::http::{HeaderMap, Uri};
use secrecy::{ExposeSecret, SecretString};

use crate::error::WebhookError;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Query parameter accepted as an alternative to the header.
pub const SECRET_QUERY_PARAM: &str = "secret";

/// Compare two strings without short-circuiting on the first differing byte.
///
/// Strings of different length never match; the expected value is still
/// scanned so the early return costs the same as a full comparison.
pub fn constant_time_eq(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();

    if expected.len() != provided.len() {
        let mut sink = 0u8;
        for byte in expected {
            sink |= byte ^ byte;
        }
        std::hint::black_box(sink);
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(provided) {
        diff |= a ^ b;
    }
    diff == 0
}

/// Pull the caller's secret from the header or the `secret` query parameter.
fn provided_secret(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }

    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SECRET_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Verify the request against the configured secret.
///
/// A missing server secret, a missing credential and a wrong credential all
/// produce the same `Unauthorized` error.
pub fn authorize(
    expected: Option<&SecretString>,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<(), WebhookError> {
    let Some(expected) = expected else {
        tracing::error!("Webhook secret is not configured, rejecting request");
        return Err(WebhookError::Unauthorized);
    };

    let Some(provided) = provided_secret(headers, uri) else {
        tracing::warn!("Webhook request without credentials");
        return Err(WebhookError::Unauthorized);
    };

    if !constant_time_eq(expected.expose_secret(), &provided) {
        tracing::warn!("Webhook request with invalid secret");
        return Err(WebhookError::Unauthorized);
    }

    Ok(())
}
