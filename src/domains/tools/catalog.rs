//! Tool catalog: registration, filtering, and selection validation.
//!
//! Tools are registered explicitly at startup through
//! [`ToolCatalog::register_tool`] - there is no runtime discovery. Filtering
//! is deny-by-default: an empty or absent selection exposes nothing, and
//! exposing the whole catalog requires enumerating every tool name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domains::credentials::CredentialRecord;
use crate::domains::registry::ConfigurationIssue;

use super::error::ToolError;

/// Tool metadata attached at registration.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    /// Capability category (e.g. "ecommerce", "payments").
    pub category: String,

    /// Whether the tool needs resolved credentials before it may run.
    pub requires_auth: bool,
}

/// Per-call environment handed to every handler.
#[derive(Debug, Clone)]
pub struct ToolCallEnv {
    /// Resolved credentials, when the integration is configured.
    pub credentials: Option<CredentialRecord>,

    /// Server-level settings passed through to the handler.
    pub settings: serde_json::Value,

    /// Unique id for this invocation.
    pub request_id: Uuid,

    /// Invocation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ToolCallEnv {
    pub fn new(credentials: Option<CredentialRecord>, settings: serde_json::Value) -> Self {
        Self {
            credentials,
            settings,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

/// Executable body of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError>;
}

/// A named, schema-described callable unit exposed to an agent.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub metadata: ToolMetadata,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        self.handler.clone()
    }

    /// Listing entry sent to clients.
    pub fn to_listing(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Partition of a requested selection into valid and invalid names.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SelectionReport {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// A backend server's full tool catalog.
#[derive(Default, Clone)]
pub struct ToolCatalog {
    server: String,
    tools: Vec<Arc<ToolDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_server(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Register one tool. Duplicate names are a configuration issue.
    pub fn register_tool(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: Arc<dyn ToolHandler>,
        metadata: ToolMetadata,
    ) -> Result<(), ConfigurationIssue> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ConfigurationIssue::DuplicateTool {
                server: self.server.clone(),
                tool: name,
            });
        }

        let descriptor = Arc::new(ToolDescriptor {
            name: name.clone(),
            description: description.into(),
            input_schema,
            metadata,
            handler,
        });
        self.by_name.insert(name, self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn tools(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Intersect the catalog with a selection, deny-by-default.
    ///
    /// `None` and an empty list both yield the empty set; invalid names are
    /// dropped with a warning and never silently included.
    pub fn filter(&self, selected: Option<&[String]>) -> Vec<Arc<ToolDescriptor>> {
        let Some(selected) = selected else {
            return Vec::new();
        };
        if selected.is_empty() {
            return Vec::new();
        }

        let report = self.validate_selection(selected);
        self.tools
            .iter()
            .filter(|t| report.valid.iter().any(|name| *name == t.name))
            .cloned()
            .collect()
    }

    /// Partition requested names into valid and invalid; invalid names are
    /// logged.
    pub fn validate_selection(&self, selected: &[String]) -> SelectionReport {
        let mut report = SelectionReport::default();
        for name in selected {
            if self.by_name.contains_key(name) {
                if !report.valid.contains(name) {
                    report.valid.push(name.clone());
                }
            } else {
                warn!(
                    server = %self.server,
                    tool = %name,
                    "selected tool is not in the catalog; dropping"
                );
                report.invalid.push(name.clone());
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(
            &self,
            arguments: serde_json::Value,
            _env: &ToolCallEnv,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(arguments)
        }
    }

    fn catalog_with(names: &[&str]) -> ToolCatalog {
        let mut catalog = ToolCatalog::for_server("test");
        for name in names {
            catalog
                .register_tool(
                    *name,
                    format!("{name} tool"),
                    serde_json::json!({"type": "object"}),
                    Arc::new(EchoHandler),
                    ToolMetadata {
                        category: "test".into(),
                        requires_auth: false,
                    },
                )
                .unwrap();
        }
        catalog
    }

    #[test]
    fn test_filter_intersects() {
        let catalog = catalog_with(&["a", "b", "c"]);
        let selected = vec!["a".to_string(), "c".to_string()];
        let filtered = catalog.filter(Some(&selected));
        let names: Vec<_> = filtered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_selection_denies_all() {
        let catalog = catalog_with(&["a", "b", "c"]);
        assert!(catalog.filter(Some(&[])).is_empty());
        assert!(catalog.filter(None).is_empty());
    }

    #[test]
    fn test_invalid_name_dropped_with_report() {
        let catalog = catalog_with(&["a", "b", "c"]);
        let selected = vec!["x".to_string()];
        assert!(catalog.filter(Some(&selected)).is_empty());

        let report = catalog.validate_selection(&selected);
        assert!(report.valid.is_empty());
        assert_eq!(report.invalid, vec!["x".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut catalog = catalog_with(&["a"]);
        let err = catalog
            .register_tool(
                "a",
                "again",
                serde_json::json!({}),
                Arc::new(EchoHandler),
                ToolMetadata {
                    category: "test".into(),
                    requires_auth: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ConfigurationIssue::DuplicateTool { .. }));
    }

    #[test]
    fn test_selection_deduplicates_valid_names() {
        let catalog = catalog_with(&["a"]);
        let selected = vec!["a".to_string(), "a".to_string()];
        let report = catalog.validate_selection(&selected);
        assert_eq!(report.valid, vec!["a".to_string()]);
    }
}
