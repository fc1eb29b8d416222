//! JSON-RPC 2.0 envelopes and reserved error codes.

use serde_json::{json, Value};

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
/// Server-defined: the tool or resource ran and failed.
pub const EXECUTION_ERROR: i64 = -32000;

/// A protocol-level error, rendered into the `error` member of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(EXECUTION_ERROR, message)
    }
}

/// `{"jsonrpc":"2.0","id":…,"result":…}`. A missing id is echoed as `null`.
pub fn success(id: Option<Value>, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "result": result,
    })
}

/// `{"jsonrpc":"2.0","id":…,"error":{"code":…,"message":…}}`.
pub fn failure(id: Option<Value>, error: &RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": {
            "code": error.code,
            "message": error.message,
        }
    })
}

/// Build the response for `outcome`, correlated to `id`.
pub fn respond(id: Option<Value>, outcome: Result<Value, RpcError>) -> Value {
    match outcome {
        Ok(result) => success(id, result),
        Err(e) => failure(id, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_echoed_verbatim() {
        let resp = success(Some(json!("abc-1")), json!({}));
        assert_eq!(resp["id"], "abc-1");
        assert_eq!(resp["jsonrpc"], "2.0");

        let resp = success(Some(json!(7)), json!({}));
        assert_eq!(resp["id"], 7);
    }

    #[test]
    fn missing_id_becomes_null() {
        let resp = failure(None, &RpcError::method_not_found("Method not found: x"));
        assert!(resp["id"].is_null());
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert!(resp.get("result").is_none());
    }
}
