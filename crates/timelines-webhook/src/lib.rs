//! WhatsApp inbound webhook processor for the Timelines CRM.
//!
//! Each delivery from the WhatsApp provider is authenticated, validated and
//! folded into the CRM: the business line becomes a channel, the chat's phone
//! is matched to a person (or creates one), the chat becomes a conversation
//! and the message is stored with any attachment re-hosted in private storage.
//! Provider redeliveries are absorbed by idempotent writes.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod payload;
pub mod phone;
pub mod pipeline;
pub mod routes;
pub mod sanitize;
pub mod state;
pub mod timeline;

use std::any::Any;

use axum::http::{header, HeaderName, Method};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::WebhookError;
pub use state::AppState;

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    WebhookError::Internal("handler panicked".to_string()).into_response()
}

/// Build the application with routes, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::SECRET_HEADER),
        ]);

    routes::router()
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
