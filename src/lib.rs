//! MCP Tool Gateway Library
//!
//! This crate provides a multi-tenant Model Context Protocol (MCP) gateway:
//! one HTTP surface in front of many integration backends, with per-tenant
//! credential resolution, per-agent tool exposure, and usage attribution.
//!
//! # Architecture
//!
//! The gateway is organized into the following modules:
//!
//! - **core**: Configuration, error handling, request-context propagation,
//!   rate limiting, gateway assembly, and the HTTP transport
//! - **domains**: Business logic organized by bounded contexts
//!   - **registry**: Static server descriptors and startup validation
//!   - **credentials**: The prioritized credential resolution chain
//!   - **tools**: Tool catalogs, selection filtering, and dispatch
//!   - **usage**: Usage attribution and ledger delivery
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_gateway::core::{Config, Gateway, HttpConfig};
//! use mcp_gateway::core::transport::http::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let transport = HttpTransport::new(config.http.clone());
//!     let gateway = Gateway::builder(config).build()?;
//!     transport.run(gateway).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, Gateway, Result};
