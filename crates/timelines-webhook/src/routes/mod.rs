//! Route handlers for the webhook service.

pub mod health;
pub mod webhook;

use axum::routing::{get, post, MethodRouter};
use axum::Router;

use crate::state::AppState;

fn webhook_route() -> MethodRouter<AppState> {
    post(webhook::receive)
        .options(webhook::preflight)
        .fallback(webhook::method_not_allowed)
}

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // The provider posts to either path
        .route("/", webhook_route())
        .route("/webhook", webhook_route())
        .route("/health", get(health::health))
}
