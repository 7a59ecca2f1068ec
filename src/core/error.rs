//! Error types and handling for the gateway.
//!
//! This module defines a unified error type that can represent errors from
//! all domains and external dependencies, providing consistent error handling
//! across the entire application.

use thiserror::Error;

use crate::domains::credentials::CredentialError;
use crate::domains::registry::ConfigurationIssue;
use crate::domains::tools::ToolError;

/// A specialized Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the gateway.
///
/// This enum represents all possible errors that can occur within the
/// gateway, providing a unified error handling interface.
#[derive(Error, Debug)]
pub enum Error {
    /// Startup configuration validation failed.
    #[error("invalid gateway configuration: {0:?}")]
    Configuration(Vec<ConfigurationIssue>),

    /// No registered server matches the requested name or integration type.
    #[error("Unknown server: {0}")]
    ServerNotFound(String),

    /// Credential resolution errors.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Tool lookup or execution errors.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The organization exceeded its request budget for the current window.
    #[error("rate limit exceeded for organization {organization_id}")]
    RateLimited { organization_id: String },

    /// IO errors from the transport layer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error with a custom message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Io(_) | Self::Tool(ToolError::Timeout { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_not_found_display() {
        let error = Error::ServerNotFound("ghost".to_string());
        assert_eq!(error.to_string(), "Unknown server: ghost");
    }

    #[test]
    fn test_credential_error_is_transparent() {
        let error: Error = CredentialError::NotConfigured.into();
        assert_eq!(
            error.to_string(),
            CredentialError::NotConfigured.to_string()
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RateLimited {
            organization_id: "org_1".into()
        }
        .is_retryable());
        assert!(!Error::ServerNotFound("x".into()).is_retryable());
        assert!(Error::Tool(ToolError::Timeout { attempts: 2 }).is_retryable());
        assert!(!Error::Tool(ToolError::unknown("x")).is_retryable());
    }
}
