//! Pre-shared bearer-token authentication.
//!
//! `POST /mcp` requires an `Authorization` header carrying the configured
//! token, either as `Bearer <token>` or as the bare token. `/health` and `/`
//! are public.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

/// Axum middleware that rejects requests without a valid token before they
/// reach the dispatcher. The expected token is injected via [`AuthToken`].
///
/// # Error responses
///
/// - `401 Unauthorized` - header missing
/// - `403 Forbidden` - token present but wrong
/// - `500 Internal Server Error` - [`AuthToken`] extension not found (misconfiguration)
pub async fn require_token(request: Request, next: Next) -> Response {
    let Some(expected) = request.extensions().get::<AuthToken>().map(|t| t.0.clone()) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Server configuration error"})),
        )
            .into_response();
    };

    let Some(header) = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Missing Authorization header");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Missing Authorization header"})),
        )
            .into_response();
    };

    if !constant_time_eq(expected.as_bytes(), extract_token(header).as_bytes()) {
        warn!("Invalid authentication token provided");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Invalid authentication token"})),
        )
            .into_response();
    }

    next.run(request).await
}

/// Strip an optional, case-insensitive `Bearer ` prefix.
pub fn extract_token(header: &str) -> &str {
    let header = header.trim();
    match header.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => header[7..].trim_start(),
        _ => header,
    }
}

/// Compare a presented token with the configured one in time that depends
/// only on the configured token's length.
pub fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    let mut diff = u8::from(expected.len() != provided.len());
    for (i, e) in expected.iter().enumerate() {
        let p = provided.get(i).copied().unwrap_or(0xff);
        diff |= e ^ p;
    }
    diff == 0
}

/// Extension type carrying the expected token, injected into the router
/// layer so [`require_token`] can access it without touching `AppState`.
#[derive(Clone)]
pub struct AuthToken(pub String);
