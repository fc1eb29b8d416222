//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::device::DeviceLink;
use crate::dispatch::Dispatcher;

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
    /// Owns the power controller and session registry.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: Arc<Config>, link: Arc<DeviceLink>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&config), link));
        Self {
            config,
            start_time: Instant::now(),
            dispatcher,
        }
    }
}
