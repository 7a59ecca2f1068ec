//! Server registry - static mapping from server names and integration types
//! to descriptors and tool catalogs.
//!
//! The registry is populated once at startup and read concurrently afterwards;
//! it is the only shared state the dispatcher touches besides the optional
//! credential cache.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::domains::tools::ToolCatalog;

use super::descriptor::{IntegrationType, ServerDescriptor};
use super::error::ConfigurationIssue;

/// Minimum per-call timeout accepted by validation.
pub const MIN_TIMEOUT_MS: u64 = 250;

/// Upper bound on configured retries.
pub const MAX_RETRIES: u32 = 10;

/// One registered server: its descriptor plus the full tool catalog.
#[derive(Clone)]
pub struct ServerEntry {
    pub descriptor: Arc<ServerDescriptor>,
    pub catalog: Arc<ToolCatalog>,
}

/// Registry of all backend servers known to the gateway.
#[derive(Default)]
pub struct ServerRegistry {
    servers: HashMap<String, ServerEntry>,
    by_integration_type: HashMap<IntegrationType, String>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server and map all of its integration types to it.
    ///
    /// Registration itself never fails; problems surface through
    /// [`validate_configuration`](Self::validate_configuration) before the
    /// gateway starts serving traffic.
    pub fn register(&mut self, descriptor: ServerDescriptor, catalog: ToolCatalog) {
        let name = descriptor.name.clone();
        if self.servers.contains_key(&name) {
            warn!("server `{}` registered twice; replacing earlier entry", name);
        }

        for integration_type in &descriptor.supported_integration_types {
            self.by_integration_type
                .insert(integration_type.clone(), name.clone());
        }

        self.servers.insert(
            name,
            ServerEntry {
                descriptor: Arc::new(descriptor),
                catalog: Arc::new(catalog),
            },
        );
    }

    /// Look up a server by its unique name.
    pub fn lookup(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.get(name)
    }

    /// Look up the server registered for an integration type.
    pub fn lookup_by_integration_type(
        &self,
        integration_type: &IntegrationType,
    ) -> Option<&ServerEntry> {
        self.by_integration_type
            .get(integration_type)
            .and_then(|name| self.servers.get(name))
    }

    /// Resolve a request path segment: exact server name first, then
    /// integration type.
    pub fn resolve(&self, segment: &str) -> Option<&ServerEntry> {
        self.lookup(segment)
            .or_else(|| self.lookup_by_integration_type(&IntegrationType::new(segment)))
    }

    /// All registered server names.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    /// All mapped integration types.
    pub fn integration_types(&self) -> Vec<&IntegrationType> {
        self.by_integration_type.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Run the startup validation pass.
    ///
    /// Checks are aggregated, not short-circuited: every problem across every
    /// server is reported. Offending servers are removed so that the rest of
    /// the registry keeps serving; integration-type mappings left dangling by
    /// a removal are dropped as well.
    pub fn validate_configuration(&mut self) -> Vec<ConfigurationIssue> {
        let mut issues = Vec::new();
        let mut rejected: Vec<String> = Vec::new();

        for (name, entry) in &self.servers {
            let descriptor = &entry.descriptor;
            let mut server_ok = true;

            if descriptor.name.trim().is_empty() {
                issues.push(ConfigurationIssue::EmptyServerName);
                server_ok = false;
            }

            if !descriptor.transport.is_complete() {
                issues.push(ConfigurationIssue::IncompleteTransport {
                    server: name.clone(),
                });
                server_ok = false;
            }

            if descriptor.supported_integration_types.is_empty() {
                issues.push(ConfigurationIssue::NoIntegrationTypes {
                    server: name.clone(),
                });
                server_ok = false;
            }

            if descriptor.timeout_ms < MIN_TIMEOUT_MS {
                issues.push(ConfigurationIssue::TimeoutTooLow {
                    server: name.clone(),
                    timeout_ms: descriptor.timeout_ms,
                    floor_ms: MIN_TIMEOUT_MS,
                });
                server_ok = false;
            }

            if descriptor.retries > MAX_RETRIES {
                issues.push(ConfigurationIssue::RetriesTooHigh {
                    server: name.clone(),
                    retries: descriptor.retries,
                    limit: MAX_RETRIES,
                });
                server_ok = false;
            }

            if !server_ok {
                rejected.push(name.clone());
            }
        }

        for name in &rejected {
            warn!("removing server `{}` after failed validation", name);
            self.servers.remove(name);
        }

        // Mappings referencing a missing descriptor (removed above, or never
        // registered) are reported and dropped.
        let dangling: Vec<IntegrationType> = self
            .by_integration_type
            .iter()
            .filter(|(_, server)| !self.servers.contains_key(*server))
            .map(|(ty, _)| ty.clone())
            .collect();

        for integration_type in dangling {
            let server = self
                .by_integration_type
                .remove(&integration_type)
                .unwrap_or_default();
            issues.push(ConfigurationIssue::DanglingIntegrationType {
                integration_type,
                server,
            });
        }

        issues
    }
}
