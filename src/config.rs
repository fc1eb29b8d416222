//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** - `DEVICE_IP`, `DEVICE_PORT`, `MCP_AUTH_TOKEN`,
//!    `MCP_CONTEXT_DESCRIPTION`, `MCP_SAFETY_MAX_POWER_0_100`,
//!    `TOOL_DESC_<TOOL>`, `PORT`
//! 2. **Config file** - path via `--config <path>`, or `fancy-gateway.toml` in CWD
//! 3. **Compiled defaults** - see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8000"
//! session_idle_timeout_secs = 3600
//! session_sweep_interval_secs = 60
//!
//! [auth]
//! token = "your-secret-token"
//!
//! [device]
//! ip = "192.168.4.1"      # omit to run unconfigured
//! port = 80
//! timeout_secs = 10
//! step_delay_ms = 100
//!
//! [safety]
//! max_power = 60          # clamped to 0..=100
//!
//! [tools]
//! context = "Lab rig"
//!
//! [tools.descriptions]
//! beep = "Short audible signal."
//!
//! [logging]
//! level = "info"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "fancy-gateway.toml";

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("MCP_AUTH_TOKEN environment variable (or auth.token) is required")]
    MissingAuthToken,
    #[error("{name} must be an integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener and session housekeeping.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:8000`).
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Sessions idle longer than this are evicted (default 3600).
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_secs: u64,
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Pre-shared bearer token. Required; override with `MCP_AUTH_TOKEN`.
    #[serde(default)]
    pub token: String,
}

/// Downstream device address and pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device IP or hostname. `None` means every device call fails fast.
    pub ip: Option<String>,
    #[serde(default = "default_device_port")]
    pub port: u16,
    /// Per-request timeout in seconds (default 10).
    #[serde(default = "default_device_timeout")]
    pub timeout_secs: u64,
    /// Pause between consecutive power step commands (default 100 ms).
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

/// Operator safety limits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyConfig {
    /// Upper bound on any power level the gateway will set.
    pub max_power: Option<i64>,
}

/// Tool description overrides and the optional context tag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    /// Prefixed as `[context] ` onto every tool, resource and prompt description.
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub descriptions: HashMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_session_idle_timeout() -> u64 {
    3600
}
fn default_session_sweep_interval() -> u64 {
    60
}
fn default_device_port() -> u16 {
    80
}
fn default_device_timeout() -> u64 {
    10
}
fn default_step_delay_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            session_idle_timeout_secs: default_session_idle_timeout(),
            session_sweep_interval_secs: default_session_sweep_interval(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ip: None,
            port: default_device_port(),
            timeout_secs: default_device_timeout(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, that file must exist. Otherwise `fancy-gateway.toml`
    /// in the current directory is used when present.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Config::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides through `lookup`, then validate.
    ///
    /// Empty values are treated as unset.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(ip) = var("DEVICE_IP") {
            self.device.ip = Some(ip);
        }
        if let Some(port) = var("DEVICE_PORT") {
            self.device.port = port.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "DEVICE_PORT",
                value: port,
            })?;
        }
        if let Some(token) = var("MCP_AUTH_TOKEN") {
            self.auth.token = token;
        }
        if let Some(context) = var("MCP_CONTEXT_DESCRIPTION") {
            self.tools.context = context;
        }
        if let Some(max) = var("MCP_SAFETY_MAX_POWER_0_100") {
            let parsed = max.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: "MCP_SAFETY_MAX_POWER_0_100",
                value: max,
            })?;
            self.safety.max_power = Some(parsed);
        }
        for tool in crate::tools::Tool::ALL {
            if let Some(desc) = var(&format!("TOOL_DESC_{}", tool.name().to_uppercase())) {
                self.tools.descriptions.insert(tool.name().to_string(), desc);
            }
        }
        if let Some(port) = var("PORT") {
            let port: u16 = port.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "PORT",
                value: port,
            })?;
            self.server.listen = format!("0.0.0.0:{port}");
        }

        self.safety.max_power = self.safety.max_power.map(|m| m.clamp(0, 100));
        if self.device.ip.as_deref().is_some_and(str::is_empty) {
            self.device.ip = None;
        }
        if self.auth.token.is_empty() {
            return Err(ConfigError::MissingAuthToken);
        }
        Ok(self)
    }

    /// `http://<ip>:<port>` when a device address is configured.
    pub fn device_base_url(&self) -> Option<String> {
        self.device
            .ip
            .as_ref()
            .map(|ip| format!("http://{}:{}", ip, self.device.port))
    }

    /// The safety ceiling as a power level, already clamped at load time.
    pub fn max_power(&self) -> Option<u8> {
        self.safety
            .max_power
            .map(|m| u8::try_from(m.clamp(0, 100)).unwrap_or(100))
    }

    /// `text` with the operator context tag prepended, if one is set.
    pub fn with_context(&self, text: &str) -> String {
        if self.tools.context.is_empty() {
            text.to_string()
        } else {
            format!("[{}] {}", self.tools.context, text)
        }
    }

    /// Description for `tool`, falling back to `default` when not overridden.
    pub fn tool_description(&self, tool: &str, default: &str) -> String {
        let desc = self
            .tools
            .descriptions
            .get(tool)
            .map_or(default, String::as_str);
        self.with_context(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::default().with_env(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuthToken));
    }

    #[test]
    fn env_overrides_file() {
        let config = Config::from_toml_str(
            r#"
            [auth]
            token = "from-file"
            [device]
            ip = "10.0.0.2"
            port = 8080
            "#,
        )
        .unwrap()
        .with_env(env(&[("MCP_AUTH_TOKEN", "from-env"), ("DEVICE_PORT", "81")]))
        .unwrap();

        assert_eq!(config.auth.token, "from-env");
        assert_eq!(config.device_base_url().as_deref(), Some("http://10.0.0.2:81"));
    }

    #[test]
    fn no_device_ip_means_no_base_url() {
        let config = Config::default()
            .with_env(env(&[("MCP_AUTH_TOKEN", "t"), ("DEVICE_IP", "")]))
            .unwrap();
        assert!(config.device_base_url().is_none());
    }

    #[test]
    fn safety_ceiling_is_clamped() {
        let high = Config::default()
            .with_env(env(&[("MCP_AUTH_TOKEN", "t"), ("MCP_SAFETY_MAX_POWER_0_100", "250")]))
            .unwrap();
        assert_eq!(high.max_power(), Some(100));

        let low = Config::default()
            .with_env(env(&[("MCP_AUTH_TOKEN", "t"), ("MCP_SAFETY_MAX_POWER_0_100", "-3")]))
            .unwrap();
        assert_eq!(low.max_power(), Some(0));
    }

    #[test]
    fn non_numeric_ceiling_is_rejected() {
        let err = Config::default()
            .with_env(env(&[("MCP_AUTH_TOKEN", "t"), ("MCP_SAFETY_MAX_POWER_0_100", "high")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn tool_descriptions_take_context_prefix() {
        let config = Config::default()
            .with_env(env(&[
                ("MCP_AUTH_TOKEN", "t"),
                ("MCP_CONTEXT_DESCRIPTION", "Lab"),
                ("TOOL_DESC_BEEP", "Chirp."),
            ]))
            .unwrap();
        assert_eq!(config.tool_description("beep", "default"), "[Lab] Chirp.");
        assert_eq!(config.tool_description("shock", "Zap."), "[Lab] Zap.");
    }

    #[test]
    fn port_env_sets_listen_address() {
        let config = Config::default()
            .with_env(env(&[("MCP_AUTH_TOKEN", "t"), ("PORT", "9000")]))
            .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
    }
}
