//! HTTP route handlers.
//!
//! All handlers except [`health`] and the root listing require authentication
//! via the [`crate::auth::require_token`] middleware.

pub mod health;
pub mod mcp;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthToken};
use crate::state::AppState;

/// Build the full router: public info routes plus the authenticated MCP endpoint.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health));

    let authed_routes = Router::new()
        .route("/mcp", post(mcp::mcp))
        .layer(middleware::from_fn(auth::require_token));

    Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .layer(Extension(AuthToken(state.config.auth.token.clone())))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
