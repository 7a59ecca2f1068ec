//! Gateway Entry Point
//!
//! This is the main entry point for the MCP tool gateway. It initializes
//! logging, loads configuration, assembles the gateway, and starts the HTTP
//! transport.

use anyhow::Result;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use mcp_gateway::core::Gateway;
use mcp_gateway::core::transport::http::HttpTransport;
use mcp_gateway::core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    let transport = HttpTransport::new(config.http.clone());

    // Assemble the gateway
    let gateway = Gateway::builder(config).build()?;

    if let Some(limiter) = gateway.rate_limiter() {
        limiter.spawn_sweeper(Duration::from_secs(60));
    }

    info!("Gateway initialized");

    transport.run(gateway).await?;

    info!("Gateway shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Configures tracing with the specified log level and format.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
