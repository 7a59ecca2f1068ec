//! Registry configuration errors.

use thiserror::Error;

use super::descriptor::IntegrationType;

/// A single startup-validation problem, scoped to one server.
///
/// Issues are aggregated into a list rather than aborting validation; a bad
/// server descriptor must not take down registration of valid servers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationIssue {
    /// Descriptor has an empty or whitespace-only name.
    #[error("server descriptor has an empty name")]
    EmptyServerName,

    /// Transport is missing its command or base URL.
    #[error("server `{server}` has an incomplete transport definition")]
    IncompleteTransport { server: String },

    /// Descriptor declares no supported integration types.
    #[error("server `{server}` supports no integration types")]
    NoIntegrationTypes { server: String },

    /// Timeout is below the enforced floor.
    #[error("server `{server}` timeout {timeout_ms}ms is below the {floor_ms}ms floor")]
    TimeoutTooLow {
        server: String,
        timeout_ms: u64,
        floor_ms: u64,
    },

    /// Retry count exceeds the enforced ceiling.
    #[error("server `{server}` retries {retries} exceeds the limit of {limit}")]
    RetriesTooHigh {
        server: String,
        retries: u32,
        limit: u32,
    },

    /// An integration-type mapping points at a server that is not registered.
    #[error("integration type `{integration_type}` maps to unknown server `{server}`")]
    DanglingIntegrationType {
        integration_type: IntegrationType,
        server: String,
    },

    /// Two tools with the same name were registered on one server.
    #[error("server `{server}` registered duplicate tool `{tool}`")]
    DuplicateTool { server: String, tool: String },

    /// An integration failed while building its descriptor or catalog.
    #[error("integration `{integration}` failed to register: {message}")]
    RegistrationFailed {
        integration: String,
        message: String,
    },
}
