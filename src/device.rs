//! HTTP link to the downstream device.
//!
//! [`DeviceLink`] wraps a shared `reqwest::Client` and issues one
//! unauthenticated `GET <base_url><path>` per command. Every outcome is folded
//! into a [`CommandResult`]; nothing here returns `Err` to the caller.
//!
//! ## Response decoding
//!
//! A 2xx body is parsed as JSON. Devices that answer with plain text get the
//! body wrapped as `{"response": "<text>"}`.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

/// Outcome of one device command, or of a composite power operation.
///
/// `success == false` always carries an `error`; `success == true` never does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub endpoint: String,
}

impl CommandResult {
    pub fn ok(endpoint: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            endpoint: endpoint.into(),
        }
    }

    pub fn failed(endpoint: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            endpoint: endpoint.into(),
        }
    }
}

/// Failures inside a single device request.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device IP not configured. Set DEVICE_IP environment variable.")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Device returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Shared HTTP client for the single configured device.
pub struct DeviceLink {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl DeviceLink {
    /// Build a link to `base_url` (no trailing slash). `None` leaves the link
    /// unconfigured: every [`send`](Self::send) fails without touching the network.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.map(|u| u.trim_end_matches('/').to_string());
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// `GET <base_url><path>`. `path` must start with `/`.
    pub async fn send(&self, path: &str) -> CommandResult {
        match self.get(path).await {
            Ok(data) => {
                info!("Command successful: {path}");
                CommandResult::ok(path, data)
            }
            Err(e) => {
                error!("Device command {path} failed: {e}");
                CommandResult::failed(path, e.to_string())
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Value, DeviceError> {
        let base_url = self.base_url.as_deref().ok_or(DeviceError::NotConfigured)?;
        let url = format!("{base_url}{path}");
        info!("Sending GET request to: {url}");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(DeviceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or_else(|_| json!({ "response": body })))
    }
}
