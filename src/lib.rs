#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]

//! fancy-gateway library - the MCP gateway as reusable building blocks.
//!
//! - `config` - TOML + env-var configuration
//! - `device` - HTTP link to the device, `CommandResult`
//! - `power` - absolute power level on top of the step API, safety ceiling
//! - `tools` - tool registry and tool-call translation
//! - `resources`, `prompts` - read-only MCP resources and prompt templates
//! - `sessions` - MCP session registry with idle sweep
//! - `dispatch` - JSON-RPC method routing
//! - `auth`, `routes`, `state` - the axum HTTP surface

pub mod auth;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod power;
pub mod prompts;
pub mod resources;
pub mod routes;
pub mod rpc;
pub mod sessions;
pub mod state;
pub mod tools;

// Re-export key types at crate root for convenience.
pub use config::Config;
pub use device::{CommandResult, DeviceLink};
pub use dispatch::Dispatcher;
pub use power::PowerController;
pub use sessions::SessionRegistry;
pub use state::AppState;
