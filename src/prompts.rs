//! Canned MCP prompts.

use serde_json::{json, Value};

use crate::config::Config;
use crate::rpc::RpcError;

/// `prompts/list` result.
pub fn list(config: &Config) -> Value {
    json!({
        "prompts": [
            {
                "name": "quick_shock",
                "description": config.with_context("Quick shock with specified power level"),
                "arguments": [
                    {
                        "name": "power",
                        "description": "Power level (1-100)",
                        "required": true
                    }
                ]
            },
            {
                "name": "enable_mode",
                "description": config.with_context("Enable a specific device mode"),
                "arguments": [
                    {
                        "name": "mode",
                        "description": "Mode: pet_training, sleep_deprivation, random, timer",
                        "required": true
                    }
                ]
            }
        ]
    })
}

/// `prompts/get` result: the named template with `args` interpolated.
pub fn get(name: &str, args: &Value) -> Result<Value, RpcError> {
    let (description, text) = match name {
        "quick_shock" => {
            let power = display_arg(args, "power", "50");
            (
                format!("Quick shock at {power}%"),
                format!("Send a shock at {power}% power using the shock tool."),
            )
        }
        "enable_mode" => {
            let mode = display_arg(args, "mode", "pet_training");
            (
                format!("Enable {mode}"),
                format!("Enable {mode} mode on the device."),
            )
        }
        _ => return Err(RpcError::invalid_params(format!("Unknown prompt: {name}"))),
    };

    Ok(json!({
        "description": description,
        "messages": [
            { "role": "user", "content": { "type": "text", "text": text } }
        ]
    }))
}

/// Prompt arguments arrive as strings per MCP, but numbers are tolerated.
fn display_arg(args: &Value, key: &str, default: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_shock_interpolates_power() {
        let prompt = get("quick_shock", &json!({ "power": "35" })).unwrap();
        assert_eq!(prompt["description"], "Quick shock at 35%");
        assert_eq!(
            prompt["messages"][0]["content"]["text"],
            "Send a shock at 35% power using the shock tool."
        );
    }

    #[test]
    fn enable_mode_defaults() {
        let prompt = get("enable_mode", &json!({})).unwrap();
        assert_eq!(
            prompt["messages"][0]["content"]["text"],
            "Enable pet_training mode on the device."
        );
    }

    #[test]
    fn numeric_arguments_are_accepted() {
        let prompt = get("quick_shock", &json!({ "power": 20 })).unwrap();
        assert_eq!(prompt["description"], "Quick shock at 20%");
    }

    #[test]
    fn unknown_prompt_is_an_error() {
        let err = get("slow_shock", &json!({})).unwrap_err();
        assert_eq!(err.code, crate::rpc::INVALID_PARAMS);
    }
}
