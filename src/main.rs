#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # fancy-gateway
//!
//! MCP (Model Context Protocol) gateway for a PowerExchange device.
//!
//! Accepts JSON-RPC envelopes on `POST /mcp`, translates tool calls into
//! plain `GET` commands against the device's HTTP API, and keeps an
//! approximate power level so callers can set power absolutely even though
//! the device only steps it up or down.
//!
//! ## API surface
//!
//! | Method | Path      | Auth | Description                            |
//! |--------|-----------|------|----------------------------------------|
//! | GET    | `/`       | No   | Server info and tool names             |
//! | GET    | `/health` | No   | Liveness, device status, power level   |
//! | POST   | `/mcp`    | Yes  | MCP JSON-RPC endpoint                  |
//!
//! ## Architecture
//!
//! ```text
//! main.rs        - entry point, clap CLI, router setup, graceful shutdown
//! config.rs      - TOML + env-var configuration
//! auth.rs        - bearer token middleware, constant-time comparison
//! device.rs      - DeviceLink: one GET per command, CommandResult
//! power.rs       - PowerController: step sequences, safety ceiling
//! tools.rs       - tool registry, typed arguments, wire commands
//! resources.rs   - fancy:// resources
//! prompts.rs     - prompt templates
//! sessions.rs    - SessionRegistry with idle sweep
//! dispatch.rs    - JSON-RPC method dispatch
//! rpc.rs         - envelopes and error codes
//! routes/
//!   mcp.rs       - POST /mcp
//!   health.rs    - GET /health, GET /
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fancy_gateway::{routes, AppState, Config, DeviceLink};

/// MCP gateway for PowerExchange devices.
#[derive(Parser)]
#[command(name = "fancy-gateway", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fancy-gateway: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    if let Err(e) = run(config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("fancy-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let base_url = config.device_base_url();
    match &base_url {
        Some(url) => info!("Device API configured: {url}"),
        None => warn!("DEVICE_IP not set - device commands will fail until configured"),
    }
    if let Some(max) = config.max_power() {
        info!("Safety max power limit set to: {max}%");
    }
    if !config.tools.context.is_empty() {
        info!("Context description: {}", config.tools.context);
    }
    info!("Authentication enabled");

    let link = Arc::new(DeviceLink::new(
        base_url,
        Duration::from_secs(config.device.timeout_secs),
    )?);
    let state = AppState::new(Arc::new(config), link);
    let app = routes::router(state.clone());

    let listener = TcpListener::bind(&state.config.server.listen).await?;
    info!("Listening on {}", state.config.server.listen);

    // Periodic sweep: evict sessions idle past the timeout
    let sessions = state.dispatcher.sessions().clone();
    let max_idle = Duration::from_secs(state.config.server.session_idle_timeout_secs);
    let sweep_every = Duration::from_secs(state.config.server.session_sweep_interval_secs.max(1));
    let sweep_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let evicted = sessions.sweep(max_idle).await;
            if !evicted.is_empty() {
                info!("Evicted {} idle session(s)", evicted.len());
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    sweep_task.abort();
    // Dropping the last AppState releases the shared device HTTP client.
    drop(state);
    info!("Goodbye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM: {e}");
                ctrl_c.await;
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received SIGINT");
    }
}
