//! The webhook endpoint.
//!
//! Checks run in a fixed order before any write: declared size, shared
//! secret, JSON syntax, payload structure, then the event-type filter.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth;
use crate::error::{Critical, WebhookError};
use crate::payload;
use crate::pipeline::{self, Outcome};
use crate::state::AppState;

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 1_000_000;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WebhookResponse {
    Success {
        channel_id: String,
        person_id: String,
        conversation_id: String,
        is_new_conversation: bool,
    },
    Ignored {
        event_type: String,
    },
}

impl From<Outcome> for WebhookResponse {
    fn from(outcome: Outcome) -> Self {
        WebhookResponse::Success {
            channel_id: outcome.channel_id,
            person_id: outcome.person_id,
            conversation_id: outcome.conversation_id,
            is_new_conversation: outcome.is_new_conversation,
        }
    }
}

/// Reject bodies whose declared length is above the cap.
fn check_declared_length(headers: &HeaderMap) -> Critical<()> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    match declared {
        Some(length) if length > MAX_BODY_BYTES as u64 => {
            debug!(length, "Declared body length above limit");
            Err(WebhookError::PayloadTooLarge)
        }
        _ => Ok(()),
    }
}

pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: Body,
) -> Critical<Json<WebhookResponse>> {
    check_declared_length(&headers)?;
    auth::authorize(state.webhook_secret.as_ref(), &headers, &uri)?;

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| WebhookError::PayloadTooLarge)?;

    let event = payload::parse_event(&bytes)?;

    if !event.is_handled() {
        info!(event_type = %event.event_type, "Ignoring unhandled event type");
        return Ok(Json(WebhookResponse::Ignored {
            event_type: event.event_type,
        }));
    }

    let outcome = pipeline::process(&state, &event).await?;
    Ok(Json(outcome.into()))
}

/// CORS preflight without the headers the CORS layer answers itself.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> Response {
    WebhookError::MethodNotAllowed.into_response()
}
