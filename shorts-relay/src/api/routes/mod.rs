//! API route modules.

pub mod health;
pub mod webhook;

use axum::Router;

use crate::api::server::AppState;

/// Path the hub is configured to call back.
pub const WEBHOOK_PATH: &str = "/youtube-webhook";

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest(WEBHOOK_PATH, webhook::router())
        .nest("/health", health::router())
        .with_state(state)
}
