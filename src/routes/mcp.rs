//! `POST /mcp` - the streamable-HTTP MCP endpoint.
//!
//! One JSON-RPC envelope in, one envelope out. The session id created by
//! `initialize` travels in the `Mcp-Session-Id` response header, never in
//! the body.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::rpc::{self, RpcError, PARSE_ERROR};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";

pub async fn mcp(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Invalid JSON body: {e}");
            let envelope = rpc::failure(None, &RpcError::new(PARSE_ERROR, format!("Invalid JSON: {e}")));
            return json_response(StatusCode::BAD_REQUEST, &envelope, None);
        }
    };

    if let Some(sid) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        if !state.dispatcher.sessions().touch(sid).await {
            debug!("Request carries unknown session {sid}");
        }
    }

    let dispatched = state.dispatcher.dispatch(&request).await;
    json_response(
        StatusCode::OK,
        &dispatched.response,
        dispatched.session_id.as_deref(),
    )
}

fn json_response(status: StatusCode, envelope: &Value, session_id: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(envelope.to_string()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    if let Some(value) = session_id.and_then(|sid| HeaderValue::from_str(sid).ok()) {
        headers.insert(SESSION_HEADER, value);
    }
    response
}
