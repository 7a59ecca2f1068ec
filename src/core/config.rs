//! Configuration management for the gateway.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, configuration files, or defaults.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::transport::HttpConfig;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// HTTP transport configuration.
    pub http: HttpConfig,

    /// Credential resolution configuration.
    pub credentials: CredentialsConfig,

    /// Optional per-organization rate limiting.
    pub rate_limit: Option<RateLimitSettings>,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the gateway as reported to clients.
    pub name: String,

    /// The version of the gateway.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Credential resolution configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// HMAC key for verifying short-lived credential tokens. When absent,
    /// the token provider is not installed.
    pub token_signing_key: Option<String>,

    /// Whether the environment-variable fallback provider is installed.
    /// Development only; never enable in production.
    pub allow_env_fallback: bool,

    /// TTL in seconds for the (organization, integration type) credential
    /// cache. Zero disables caching.
    pub cache_ttl_secs: u64,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field(
                "token_signing_key",
                &self.token_signing_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allow_env_fallback", &self.allow_env_fallback)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

/// Per-organization rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum requests per window.
    pub max_requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_signing_key: None,
            allow_env_fallback: false,
            cache_ttl_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mcp-gateway".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            http: HttpConfig::default(),
            credentials: CredentialsConfig::default(),
            rate_limit: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.http = HttpConfig::from_env();

        if let Ok(key) = std::env::var("MCP_TOKEN_SIGNING_KEY") {
            config.credentials.token_signing_key = Some(key);
            info!("credential token provider enabled");
        }

        if let Ok(allow) = std::env::var("MCP_ALLOW_ENV_CREDENTIALS") {
            config.credentials.allow_env_fallback = allow == "1" || allow.to_lowercase() == "true";
            if config.credentials.allow_env_fallback {
                warn!("environment credential fallback enabled (development only)");
            }
        }

        if let Ok(ttl) = std::env::var("MCP_CREDENTIAL_CACHE_TTL_SECS") {
            match ttl.parse() {
                Ok(secs) => config.credentials.cache_ttl_secs = secs,
                Err(_) => warn!("ignoring invalid MCP_CREDENTIAL_CACHE_TTL_SECS: {ttl}"),
            }
        }

        if let Ok(max) = std::env::var("MCP_RATE_LIMIT_MAX")
            && let Ok(max_requests) = max.parse()
        {
            let window_secs = std::env::var("MCP_RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(60);
            config.rate_limit = Some(RateLimitSettings {
                max_requests,
                window_secs,
            });
            info!(max_requests, window_secs, "rate limiting enabled");
        }

        config
    }
}
