//! Read-only MCP resources: the device configuration/status and the map of
//! logical operations to wire endpoints.

use serde_json::{json, Value};

use crate::config::Config;
use crate::power::{PowerController, DECREASE_PATH, INCREASE_PATH, SHOCK_PATH};
use crate::rpc::RpcError;
use crate::tools::{
    BEEP, BUZZER_OFF, BUZZER_ON, MODE_OFF, MODE_PET_FAST, MODE_PET_FREEZE, MODE_PET_NORMAL,
    MODE_RANDOM, MODE_SLEEP_DEPRIVATION, MODE_TIMER, TIMER1_DOWN, TIMER1_UP, TIMER2_DOWN,
    TIMER2_UP,
};

pub const DEVICE_CONFIG_URI: &str = "fancy://config/device";
pub const ENDPOINTS_URI: &str = "fancy://info/endpoints";

/// `resources/list` result.
pub fn list(config: &Config) -> Value {
    json!({
        "resources": [
            {
                "uri": DEVICE_CONFIG_URI,
                "name": "Device Configuration",
                "description": config.with_context("Current device connection configuration and status"),
                "mimeType": "application/json"
            },
            {
                "uri": ENDPOINTS_URI,
                "name": "Available Endpoints",
                "description": config.with_context("List of all available device control endpoints"),
                "mimeType": "application/json"
            }
        ]
    })
}

/// `resources/read` result for `uri`.
pub fn read(uri: &str, config: &Config, power: &PowerController) -> Result<Value, RpcError> {
    let content = match uri {
        DEVICE_CONFIG_URI => device_status(config, power.level()),
        ENDPOINTS_URI => endpoint_map(),
        _ => return Err(RpcError::invalid_params(format!("Unknown resource URI: {uri}"))),
    };
    let text = serde_json::to_string_pretty(&content)
        .map_err(|e| RpcError::execution(format!("Failed to read resource: {e}")))?;

    Ok(json!({
        "contents": [
            {
                "uri": uri,
                "mimeType": "application/json",
                "text": text
            }
        ]
    }))
}

fn device_status(config: &Config, current_power: u8) -> Value {
    let base_url = config.device_base_url();
    let context = if config.tools.context.is_empty() {
        "None"
    } else {
        config.tools.context.as_str()
    };
    let status = if base_url.is_some() {
        "configured"
    } else {
        "not_configured"
    };
    json!({
        "device_ip": config.device.ip.as_deref().unwrap_or("Not configured"),
        "device_port": config.device.port,
        "base_url": base_url.as_deref().unwrap_or("Not configured"),
        "context_description": context,
        "current_power_level": current_power,
        "safety_max_power": config.max_power(),
        "status": status,
    })
}

fn endpoint_map() -> Value {
    json!({
        "freeze_lock": {
            "on": MODE_PET_FREEZE,
            "off": MODE_OFF,
            "note": "Freeze Lock activates Pet Training mode 3 (S2Z) - stay still, no warning"
        },
        "warning_buzzer": { "on": BUZZER_ON, "off": BUZZER_OFF },
        "pet_training": {
            "normal": MODE_PET_NORMAL,
            "fast": MODE_PET_FAST,
            "freeze": MODE_PET_FREEZE,
            "off": MODE_OFF
        },
        "sleep_deprivation": { "on": MODE_SLEEP_DEPRIVATION, "off": MODE_OFF },
        "random": { "on": MODE_RANDOM, "off": MODE_OFF },
        "timer": {
            "on": MODE_TIMER,
            "off": MODE_OFF,
            "t1_up": TIMER1_UP,
            "t1_down": TIMER1_DOWN,
            "t2_up": TIMER2_UP,
            "t2_down": TIMER2_DOWN
        },
        "beep": BEEP,
        "shock": SHOCK_PATH,
        "power": { "increase": INCREASE_PATH, "decrease": DECREASE_PATH }
    })
}
