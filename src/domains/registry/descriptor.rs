//! Server descriptor types.
//!
//! A `ServerDescriptor` is the static, startup-time description of one
//! integration backend: how to reach it, how patient to be with it, and which
//! credential fields it needs before it can be called.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a backend capability group (e.g. "shopify", "payments").
///
/// Integration types are fixed at registry load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationType(String);

impl IntegrationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntegrationType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How the gateway reaches a backend server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerTransport {
    /// In-process handlers registered at startup.
    InProcess,

    /// Remote HTTP backend.
    Http {
        /// Base URL of the backend.
        base_url: String,
    },

    /// Subprocess spawned with the given command line.
    Subprocess {
        /// Command used to launch the server process.
        command: String,
    },
}

impl ServerTransport {
    /// Whether the transport carries enough information to be used.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::InProcess => true,
            Self::Http { base_url } => !base_url.trim().is_empty(),
            Self::Subprocess { command } => !command.trim().is_empty(),
        }
    }
}

/// Static description of one backend server.
///
/// Created once at startup from static configuration and never mutated at
/// runtime; the registry hands out shared references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique server name, used as the invocation path segment.
    pub name: String,

    /// How to reach the backend.
    pub transport: ServerTransport,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Bounded retry count for timed-out calls.
    pub retries: u32,

    /// Credential fields that must all be present before authenticated tools
    /// on this server may run.
    pub required_credential_fields: Vec<String>,

    /// Integration types this server serves.
    pub supported_integration_types: Vec<IntegrationType>,

    /// Server-level settings handed to every tool call on this server.
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl ServerDescriptor {
    pub fn supports(&self, integration_type: &IntegrationType) -> bool {
        self.supported_integration_types.contains(integration_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_completeness() {
        assert!(ServerTransport::InProcess.is_complete());
        assert!(
            ServerTransport::Http {
                base_url: "https://api.example.com".into()
            }
            .is_complete()
        );
        assert!(!ServerTransport::Http { base_url: "  ".into() }.is_complete());
        assert!(!ServerTransport::Subprocess { command: "".into() }.is_complete());
    }

    #[test]
    fn test_descriptor_supports() {
        let descriptor = ServerDescriptor {
            name: "shopify".into(),
            transport: ServerTransport::InProcess,
            timeout_ms: 8_000,
            retries: 2,
            required_credential_fields: vec!["accessToken".into()],
            supported_integration_types: vec!["shopify".into()],
            settings: serde_json::json!({}),
        };

        assert!(descriptor.supports(&"shopify".into()));
        assert!(!descriptor.supports(&"payments".into()));
    }
}
