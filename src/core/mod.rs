//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the gateway,
//! including error handling, configuration, request-context propagation,
//! rate limiting, gateway assembly, and the transport layer.

pub mod config;
pub mod context;
pub mod error;
pub mod ratelimit;
pub mod server;
pub mod transport;

pub use config::Config;
pub use context::{RequestContext, amend_context, current_context, with_request_context};
pub use error::{Error, Result};
pub use ratelimit::RateLimiter;
pub use server::{Gateway, GatewayBuilder, InvocationRequest};
pub use transport::HttpConfig;
