//! MCP JSON-RPC method dispatch.
//!
//! ## Supported methods
//!
//! | Method            | Description                                  |
//! |-------------------|----------------------------------------------|
//! | `initialize`      | Handshake, creates a session                 |
//! | `initialized`     | Client acknowledgement, empty result         |
//! | `tools/list`      | List tool definitions                        |
//! | `tools/call`      | Translate a tool call into device commands   |
//! | `resources/list`  | List the two synthetic resources             |
//! | `resources/read`  | Read a resource                              |
//! | `prompts/list`    | List prompt templates                        |
//! | `prompts/get`     | Render a prompt template                     |
//! | `ping`            | Liveness check                               |
//!
//! Every response echoes the request `id` unchanged (`null` when absent).
//! Device failures never escape as faults: they come back as an `error`
//! member inside a well-formed envelope.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::device::{CommandResult, DeviceLink};
use crate::power::PowerController;
use crate::rpc::{self, RpcError};
use crate::sessions::SessionRegistry;
use crate::tools::{self, ToolCall, ToolError};
use crate::{prompts, resources};

pub const SERVER_NAME: &str = "fancy-control-mcp-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A response envelope plus the session id to send out-of-band, if any.
#[derive(Debug)]
pub struct Dispatched {
    pub response: Value,
    pub session_id: Option<String>,
}

/// Routes JSON-RPC requests to tools, resources and prompts.
pub struct Dispatcher {
    config: Arc<Config>,
    link: Arc<DeviceLink>,
    power: PowerController,
    sessions: SessionRegistry,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, link: Arc<DeviceLink>) -> Self {
        let power = PowerController::new(
            Arc::clone(&link),
            config.max_power(),
            Duration::from_millis(config.device.step_delay_ms),
        );
        Self {
            config,
            link,
            power,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn power(&self) -> &PowerController {
        &self.power
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle one request envelope.
    pub async fn dispatch(&self, request: &Value) -> Dispatched {
        let id = request.get("id").cloned();
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        let id_text = id.as_ref().map_or_else(|| "null".to_string(), Value::to_string);
        info!("Received MCP request: method={method}, id={id_text}");

        let mut session_id = None;
        let outcome = match method {
            "initialize" => {
                let sid = self.sessions.create().await;
                info!("Session {sid} initialized");
                session_id = Some(sid);
                Ok(initialize_result())
            }
            "initialized" | "notifications/initialized" | "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::tool_definitions(&self.config) })),
            "tools/call" => self.call_tool(&params).await,
            "resources/list" => Ok(resources::list(&self.config)),
            "resources/read" => {
                let uri = params.get("uri").and_then(Value::as_str).unwrap_or("");
                resources::read(uri, &self.config, &self.power)
            }
            "prompts/list" => Ok(prompts::list(&self.config)),
            "prompts/get" => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                prompts::get(name, &args)
            }
            _ => Err(RpcError::method_not_found(format!("Method not found: {method}"))),
        };

        Dispatched {
            response: rpc::respond(id, outcome),
            session_id,
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, RpcError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let call = ToolCall::parse(name, &args).map_err(|e| {
            warn!("Rejected tool call {name}: {e}");
            match e {
                ToolError::NotFound(_) => RpcError::method_not_found(e.to_string()),
                ToolError::InvalidParams(_) => RpcError::invalid_params(e.to_string()),
            }
        })?;

        let result = contain_panic(tools::execute(&call, &self.link, &self.power)).await?;

        if result.success {
            let data = result.data.unwrap_or_else(|| json!({}));
            let pretty = serde_json::to_string_pretty(&data).unwrap_or_default();
            Ok(json!({
                "content": [
                    {
                        "type": "text",
                        "text": format!(
                            "Success: Command '{name}' executed.\nEndpoint: {}\nResponse: {pretty}",
                            result.endpoint
                        )
                    }
                ]
            }))
        } else {
            let message = result.error.unwrap_or_else(|| "Unknown error".to_string());
            Err(RpcError::execution(format!(
                "Failed to execute '{name}': {message}"
            )))
        }
    }
}

/// Run a tool future, turning a panic into an execution error.
async fn contain_panic<F>(execution: F) -> Result<CommandResult, RpcError>
where
    F: Future<Output = CommandResult>,
{
    AssertUnwindSafe(execution).catch_unwind().await.map_err(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "internal error".to_string());
        error!("Tool execution error: {message}");
        RpcError::execution(format!("Execution error: {message}"))
    })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{EXECUTION_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
    use std::collections::HashSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(base_url: Option<String>, max_power: Option<i64>) -> Dispatcher {
        let mut config = Config::default();
        config.auth.token = "t".into();
        config.device.step_delay_ms = 0;
        config.safety.max_power = max_power;
        let link = DeviceLink::new(base_url, Duration::from_secs(5)).unwrap();
        Dispatcher::new(Arc::new(config), Arc::new(link))
    }

    fn call(id: Value, name: &str, arguments: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        })
    }

    #[tokio::test]
    async fn initialize_creates_session() {
        let d = dispatcher(None, None);
        let out = d
            .dispatch(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await;

        let sid = out.session_id.expect("session id");
        assert!(d.sessions().get(&sid).await.unwrap().initialized);
        assert_eq!(out.response["id"], 1);
        assert_eq!(out.response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(out.response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(out.response.get("_session_id").is_none());
    }

    #[tokio::test]
    async fn ping_and_initialized_are_empty_results() {
        let d = dispatcher(None, None);
        for method in ["ping", "initialized"] {
            let out = d.dispatch(&json!({"jsonrpc": "2.0", "id": "x", "method": method})).await;
            assert_eq!(out.response["result"], json!({}));
            assert_eq!(out.response["id"], "x");
            assert!(out.session_id.is_none());
        }
        assert_eq!(d.sessions().session_count().await, 0);
    }

    #[tokio::test]
    async fn absent_id_is_null_in_response() {
        let d = dispatcher(None, None);
        let out = d.dispatch(&json!({"jsonrpc": "2.0", "method": "ping"})).await;
        assert!(out.response["id"].is_null());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let d = dispatcher(None, None);
        let out = d
            .dispatch(&json!({"jsonrpc": "2.0", "id": 3, "method": "tools/destroy"}))
            .await;
        assert_eq!(out.response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(out.response["id"], 3);
    }

    #[tokio::test]
    async fn listed_tools_match_dispatchable_tools() {
        let d = dispatcher(None, None);
        let out = d
            .dispatch(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
            .await;
        let listed: HashSet<String> = out.response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        let known: HashSet<String> = tools::Tool::ALL
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(listed, known);

        // Every listed name reaches the translator rather than "not found".
        for name in &listed {
            let out = d.dispatch(&call(json!(1), name, json!({}))).await;
            assert_ne!(out.response["error"]["code"], METHOD_NOT_FOUND, "{name}");
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let d = dispatcher(None, None);
        let out = d.dispatch(&call(json!(9), "launch", json!({}))).await;
        assert_eq!(out.response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(out.response["error"]["message"], "Unknown tool: launch");
    }

    #[tokio::test]
    async fn missing_raw_command_is_invalid_params_without_device_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let d = dispatcher(Some(server.uri()), None);
        let out = d.dispatch(&call(json!(2), "send_raw_command", json!({}))).await;
        assert_eq!(out.response["error"]["code"], INVALID_PARAMS);
        assert_eq!(out.response["error"]["message"], "Command parameter is required");
    }

    #[tokio::test]
    async fn unconfigured_device_is_execution_error() {
        let d = dispatcher(None, None);
        let out = d.dispatch(&call(json!(4), "beep", json!({}))).await;
        assert_eq!(out.response["error"]["code"], EXECUTION_ERROR);
        let message = out.response["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to execute 'beep':"));
        assert!(message.contains("DEVICE_IP"));
    }

    #[tokio::test]
    async fn successful_call_is_rendered_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mode/S2F"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .expect(1)
            .mount(&server)
            .await;

        let d = dispatcher(Some(server.uri()), None);
        let out = d
            .dispatch(&call(
                json!(5),
                "pet_training",
                json!({"action": "on", "mode": "fast"}),
            ))
            .await;
        let text = out.response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Success: Command 'pet_training' executed."));
        assert!(text.contains("Endpoint: /mode/S2F"));
        assert!(text.contains("\"response\": \"done\""));
    }

    #[tokio::test]
    async fn power_set_73_reports_73_after_four_steps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PW/+"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(4)
            .mount(&server)
            .await;

        let d = dispatcher(Some(server.uri()), None);
        let out = d
            .dispatch(&call(
                json!(6),
                "power_control",
                json!({"action": "set", "level": 73}),
            ))
            .await;
        let text = out.response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Endpoint: power_set_73"));
        assert!(text.contains("\"power_level\": 73"));
        assert_eq!(d.power().level(), 73);
    }

    #[tokio::test]
    async fn shock_150_is_clamped_to_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PW/+"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Z1/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let d = dispatcher(Some(server.uri()), Some(60));
        let out = d.dispatch(&call(json!(7), "shock", json!({"power": 150}))).await;
        let text = out.response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Endpoint: shock_power_60"));
        assert!(text.contains("\"shock_sent\": true"));
        assert!(text.contains("\"power_limited_from\": 150"));
        assert_eq!(d.power().level(), 60);
    }

    async fn faulty_tool() -> CommandResult {
        panic!("step counter overflow")
    }

    async fn faulty_level(level: u8) -> CommandResult {
        panic!("level {level}")
    }

    #[tokio::test]
    async fn panicking_tool_becomes_execution_error() {
        let err = contain_panic(faulty_tool()).await.unwrap_err();
        assert_eq!(err.code, EXECUTION_ERROR);
        assert_eq!(err.message, "Execution error: step counter overflow");

        let formatted = contain_panic(faulty_level(7)).await.unwrap_err();
        assert_eq!(formatted.message, "Execution error: level 7");

        let fine = contain_panic(async { CommandResult::ok("/B1/1", json!({})) })
            .await
            .unwrap();
        assert!(fine.success);
    }

    #[tokio::test]
    async fn zero_power_shock_fires_at_minimum() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PW/-"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(9)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Z1/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let d = dispatcher(Some(server.uri()), None);
        let out = d.dispatch(&call(json!(8), "shock", json!({"power": 0}))).await;
        let text = out.response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Endpoint: shock_power_1"));
        assert_eq!(d.power().level(), 1);
    }

    #[tokio::test]
    async fn resources_and_prompts_round_trip() {
        let d = dispatcher(None, None);
        let out = d
            .dispatch(&json!({"id": 1, "method": "resources/read", "params": {"uri": "fancy://info/endpoints"}}))
            .await;
        assert_eq!(out.response["result"]["contents"][0]["uri"], "fancy://info/endpoints");

        let out = d
            .dispatch(&json!({"id": 2, "method": "prompts/get", "params": {"name": "nope"}}))
            .await;
        assert_eq!(out.response["error"]["code"], INVALID_PARAMS);

        let out = d.dispatch(&json!({"id": 3, "method": "prompts/list"})).await;
        assert_eq!(out.response["result"]["prompts"].as_array().unwrap().len(), 2);
    }
}
