//! Unauthenticated health and info endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::dispatch::{SERVER_NAME, SERVER_VERSION};
use crate::state::AppState;
use crate::tools::Tool;

/// `GET /health` - liveness probe with device configuration status.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let dispatcher = &state.dispatcher;
    let mut body = json!({
        "status": "healthy",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "device_configured": state.config.device_base_url().is_some(),
        "device_ip": state.config.device.ip,
        "current_power": dispatcher.power().level(),
        "sessions": dispatcher.sessions().session_count().await,
    });
    if let Some(max) = state.config.max_power() {
        body["safety_max_power"] = json!(max);
    }
    Json(body)
}

/// `GET /` - server info and the tool names exposed over MCP.
pub async fn root() -> Json<Value> {
    let tools: Vec<&str> = Tool::ALL.iter().map(|t| t.name()).collect();
    Json(json!({
        "name": "Fancy Control MCP Server",
        "version": SERVER_VERSION,
        "description": "MCP server for controlling PowerExchange IoT devices",
        "mcp_endpoint": "/mcp",
        "health_endpoint": "/health",
        "tools": tools,
    }))
}
