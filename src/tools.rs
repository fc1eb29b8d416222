//! MCP tool definitions and the translation from tool calls to device commands.
//!
//! Each tool is defined as a JSON schema (returned by [`tool_definitions`]),
//! parsed into a typed [`ToolCall`] by [`ToolCall::parse`], and executed by
//! [`execute`].
//!
//! ## Wire commands
//!
//! | Tool                | Command(s)                                     |
//! |---------------------|------------------------------------------------|
//! | `freeze_lock`       | `/mode/S2Z`, `/mode/0`                         |
//! | `warning_buzzer`    | `/S1/1`, `/S1/0`                               |
//! | `pet_training`      | `/mode/S2`, `/mode/S2F`, `/mode/S2Z`, `/mode/0`|
//! | `sleep_deprivation` | `/mode/S4`, `/mode/0`                          |
//! | `random_mode`       | `/mode/RN`, `/mode/0`                          |
//! | `timer`             | `/mode/TM`, `/mode/0`, `/T1/±`, `/T2/±`        |
//! | `beep`              | `/B1/1`                                        |
//! | `shock`             | `/PW/±` steps, then `/Z1/1`                    |
//! | `power_control`     | `/PW/+`, `/PW/-`, or a step sequence           |
//! | `send_raw_command`  | any path                                       |

use serde_json::{json, Value};

use crate::config::Config;
use crate::device::{CommandResult, DeviceLink};
use crate::power::PowerController;

pub const MODE_OFF: &str = "/mode/0";
pub const MODE_PET_NORMAL: &str = "/mode/S2";
pub const MODE_PET_FAST: &str = "/mode/S2F";
pub const MODE_PET_FREEZE: &str = "/mode/S2Z";
pub const MODE_SLEEP_DEPRIVATION: &str = "/mode/S4";
pub const MODE_RANDOM: &str = "/mode/RN";
pub const MODE_TIMER: &str = "/mode/TM";
pub const BUZZER_ON: &str = "/S1/1";
pub const BUZZER_OFF: &str = "/S1/0";
pub const TIMER1_UP: &str = "/T1/+";
pub const TIMER1_DOWN: &str = "/T1/-";
pub const TIMER2_UP: &str = "/T2/+";
pub const TIMER2_DOWN: &str = "/T2/-";
pub const BEEP: &str = "/B1/1";

/// Power used by `shock` when the caller gives none.
pub const DEFAULT_SHOCK_POWER: i64 = 50;

/// Every tool the gateway exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    FreezeLock,
    WarningBuzzer,
    PetTraining,
    SleepDeprivation,
    RandomMode,
    Timer,
    Beep,
    Shock,
    PowerControl,
    SendRawCommand,
}

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::FreezeLock,
        Tool::WarningBuzzer,
        Tool::PetTraining,
        Tool::SleepDeprivation,
        Tool::RandomMode,
        Tool::Timer,
        Tool::Beep,
        Tool::Shock,
        Tool::PowerControl,
        Tool::SendRawCommand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FreezeLock => "freeze_lock",
            Self::WarningBuzzer => "warning_buzzer",
            Self::PetTraining => "pet_training",
            Self::SleepDeprivation => "sleep_deprivation",
            Self::RandomMode => "random_mode",
            Self::Timer => "timer",
            Self::Beep => "beep",
            Self::Shock => "shock",
            Self::PowerControl => "power_control",
            Self::SendRawCommand => "send_raw_command",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Built-in description, used unless the operator overrides it.
    pub fn default_description(self) -> &'static str {
        match self {
            Self::FreezeLock => "FREEZE LOCK (BETA) - Activate Pet Training in freeze mode (mode 3/S2Z). When enabled, subject must stay completely still - any movement triggers a correction without warning.",
            Self::WarningBuzzer => "Warning Buzzer - Enable or disable the warning buzzer on the device.",
            Self::PetTraining => "Pet Training Mode - Enable or disable pet training mode with speed setting (normal, fast, or freeze).",
            Self::SleepDeprivation => "Sleep Deprivation Mode - Enable or disable sleep deprivation mode.",
            Self::RandomMode => "Random Mode - Enable or disable random activation mode.",
            Self::Timer => "Timer Mode - Enable or disable timer mode, or step timer 1 / timer 2 up or down.",
            Self::Beep => "Beep - Send a beep signal to the device (equivalent to short button press).",
            Self::Shock => "Shock - Send a shock signal with specified power level (equivalent to long button press).",
            Self::PowerControl => "Power Control - Adjust the device power level.",
            Self::SendRawCommand => "Send a raw HTTP command to the device. For advanced users.",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Self::FreezeLock => on_off_schema("'on' to lock/freeze, 'off' to unlock"),
            Self::WarningBuzzer => on_off_schema("'on' to enable buzzer, 'off' to disable"),
            Self::SleepDeprivation => on_off_schema("'on' to enable, 'off' to disable"),
            Self::RandomMode => on_off_schema("'on' to enable random mode, 'off' to disable"),
            Self::PetTraining => json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "Action: 'on' to enable, 'off' to disable",
                        "enum": ["on", "off"]
                    },
                    "mode": {
                        "type": "string",
                        "description": "Training mode: 'normal' (S2), 'fast' (S2F), or 'freeze' (S2Z - stay still, no warning). Only used when action is 'on'.",
                        "enum": ["normal", "fast", "freeze"],
                        "default": "normal"
                    }
                },
                "required": ["action"]
            }),
            Self::Timer => json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "Action: 'on' to enable timer mode, 'off' to disable, 't1_up'/'t1_down' to adjust timer 1, 't2_up'/'t2_down' to adjust timer 2",
                        "enum": ["on", "off", "t1_up", "t1_down", "t2_up", "t2_down"]
                    }
                },
                "required": ["action"]
            }),
            Self::Beep => json!({
                "type": "object",
                "properties": {}
            }),
            Self::Shock => json!({
                "type": "object",
                "properties": {
                    "power": {
                        "type": "integer",
                        "description": "Power level from 1 to 100 percent",
                        "minimum": 1,
                        "maximum": 100,
                        "default": DEFAULT_SHOCK_POWER
                    }
                }
            }),
            Self::PowerControl => json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "Action: 'increase' to raise power, 'decrease' to lower power, 'set' to set specific level",
                        "enum": ["increase", "decrease", "set"]
                    },
                    "level": {
                        "type": "integer",
                        "description": "Power level (0-100), required when action is 'set'",
                        "minimum": 0,
                        "maximum": 100
                    }
                },
                "required": ["action"]
            }),
            Self::SendRawCommand => json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Raw command path (e.g., '/REL/1', '/mode/S2', '/TX?param=value')"
                    }
                },
                "required": ["command"]
            }),
        }
    }
}

fn on_off_schema(detail: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {
                "type": "string",
                "description": format!("Action: {detail}"),
                "enum": ["on", "off"]
            }
        },
        "required": ["action"]
    })
}

/// Returns every tool definition, with descriptions resolved against `config`.
pub fn tool_definitions(config: &Config) -> Vec<Value> {
    Tool::ALL
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": config.tool_description(tool.name(), tool.default_description()),
                "inputSchema": tool.input_schema(),
            })
        })
        .collect()
}

/// Why a tool call was rejected before reaching the device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetMode {
    Normal,
    Fast,
    Freeze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    On,
    Off,
    T1Up,
    T1Down,
    T2Up,
    T2Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Increase,
    Decrease,
    Set(i64),
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Maps to exactly one device GET.
    Command(DeviceCommand),
    Shock { power: i64 },
    PowerControl(PowerAction),
}

/// A tool call that is a single wire command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    FreezeLock { on: bool },
    WarningBuzzer { on: bool },
    PetTraining { mode: Option<PetMode> },
    SleepDeprivation { on: bool },
    RandomMode { on: bool },
    Timer(TimerAction),
    Beep,
    SendRawCommand { path: String },
}

impl ToolCall {
    /// Validate `args` against the input contract of tool `name`.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        let tool = Tool::from_name(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let command = match tool {
            Tool::FreezeLock => DeviceCommand::FreezeLock { on: on_off(args)? },
            Tool::WarningBuzzer => DeviceCommand::WarningBuzzer { on: on_off(args)? },
            Tool::SleepDeprivation => DeviceCommand::SleepDeprivation { on: on_off(args)? },
            Tool::RandomMode => DeviceCommand::RandomMode { on: on_off(args)? },
            Tool::PetTraining => {
                let mode = if on_off(args)? {
                    Some(match optional_str(args, "mode")?.unwrap_or("normal") {
                        "normal" => PetMode::Normal,
                        "fast" => PetMode::Fast,
                        "freeze" => PetMode::Freeze,
                        other => {
                            return Err(invalid(format!(
                                "Invalid mode '{other}': expected normal, fast or freeze"
                            )))
                        }
                    })
                } else {
                    None
                };
                DeviceCommand::PetTraining { mode }
            }
            Tool::Timer => DeviceCommand::Timer(match required_str(args, "action")? {
                "on" => TimerAction::On,
                "t1_up" => TimerAction::T1Up,
                "t1_down" => TimerAction::T1Down,
                "t2_up" => TimerAction::T2Up,
                "t2_down" => TimerAction::T2Down,
                _ => TimerAction::Off,
            }),
            Tool::Beep => DeviceCommand::Beep,
            Tool::SendRawCommand => {
                let command = optional_str(args, "command")?
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| invalid("Command parameter is required"))?;
                DeviceCommand::SendRawCommand {
                    path: normalize_path(command),
                }
            }
            Tool::Shock => {
                return Ok(Self::Shock {
                    power: optional_int(args, "power")?.unwrap_or(DEFAULT_SHOCK_POWER),
                })
            }
            Tool::PowerControl => {
                return Ok(Self::PowerControl(match required_str(args, "action")? {
                    "increase" => PowerAction::Increase,
                    "decrease" => PowerAction::Decrease,
                    "set" => PowerAction::Set(
                        optional_int(args, "level")?
                            .ok_or_else(|| invalid("Level parameter is required when action is 'set'"))?,
                    ),
                    other => {
                        return Err(invalid(format!(
                            "Invalid action '{other}': expected increase, decrease or set"
                        )))
                    }
                }))
            }
        };
        Ok(Self::Command(command))
    }

    pub fn tool(&self) -> Tool {
        match self {
            Self::Command(command) => command.tool(),
            Self::Shock { .. } => Tool::Shock,
            Self::PowerControl(_) => Tool::PowerControl,
        }
    }
}

impl DeviceCommand {
    pub fn tool(&self) -> Tool {
        match self {
            Self::FreezeLock { .. } => Tool::FreezeLock,
            Self::WarningBuzzer { .. } => Tool::WarningBuzzer,
            Self::PetTraining { .. } => Tool::PetTraining,
            Self::SleepDeprivation { .. } => Tool::SleepDeprivation,
            Self::RandomMode { .. } => Tool::RandomMode,
            Self::Timer(_) => Tool::Timer,
            Self::Beep => Tool::Beep,
            Self::SendRawCommand { .. } => Tool::SendRawCommand,
        }
    }

    pub fn wire_path(&self) -> &str {
        match self {
            Self::FreezeLock { on: true } => MODE_PET_FREEZE,
            Self::WarningBuzzer { on: true } => BUZZER_ON,
            Self::WarningBuzzer { on: false } => BUZZER_OFF,
            Self::PetTraining { mode: Some(PetMode::Normal) } => MODE_PET_NORMAL,
            Self::PetTraining { mode: Some(PetMode::Fast) } => MODE_PET_FAST,
            Self::PetTraining { mode: Some(PetMode::Freeze) } => MODE_PET_FREEZE,
            Self::SleepDeprivation { on: true } => MODE_SLEEP_DEPRIVATION,
            Self::RandomMode { on: true } => MODE_RANDOM,
            Self::Timer(TimerAction::On) => MODE_TIMER,
            Self::Timer(TimerAction::T1Up) => TIMER1_UP,
            Self::Timer(TimerAction::T1Down) => TIMER1_DOWN,
            Self::Timer(TimerAction::T2Up) => TIMER2_UP,
            Self::Timer(TimerAction::T2Down) => TIMER2_DOWN,
            Self::FreezeLock { on: false }
            | Self::PetTraining { mode: None }
            | Self::SleepDeprivation { on: false }
            | Self::RandomMode { on: false }
            | Self::Timer(TimerAction::Off) => MODE_OFF,
            Self::Beep => BEEP,
            Self::SendRawCommand { path } => path.as_str(),
        }
    }
}

/// Run a validated call against the device.
pub async fn execute(call: &ToolCall, link: &DeviceLink, power: &PowerController) -> CommandResult {
    match call {
        ToolCall::Command(command) => link.send(command.wire_path()).await,
        ToolCall::Shock { power: level } => power.shock_at_power(*level).await,
        ToolCall::PowerControl(PowerAction::Increase) => power.increase_step().await,
        ToolCall::PowerControl(PowerAction::Decrease) => power.decrease_step().await,
        ToolCall::PowerControl(PowerAction::Set(level)) => power.set_level(*level).await,
    }
}

/// Prefix `command` with `/` unless it already has one.
pub fn normalize_path(command: &str) -> String {
    if command.starts_with('/') {
        command.to_string()
    } else {
        format!("/{command}")
    }
}

fn invalid(message: impl Into<String>) -> ToolError {
    ToolError::InvalidParams(message.into())
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(format!("Parameter '{key}' must be a string"))),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    optional_str(args, key)?.ok_or_else(|| invalid(format!("Parameter '{key}' is required")))
}

fn optional_int(args: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(format!("Parameter '{key}' must be an integer"))),
    }
}

fn on_off(args: &Value) -> Result<bool, ToolError> {
    match required_str(args, "action")? {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(invalid(format!("Invalid action '{other}': expected on or off"))),
    }
}
