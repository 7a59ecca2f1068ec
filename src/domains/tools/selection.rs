//! Agent tool selections.
//!
//! Selections are created and edited by the integration-management subsystem;
//! the gateway only reads them. When a request carries no explicit selection
//! side channel, the agent's stored selection decides what is exposed - and
//! absence of both means nothing is exposed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domains::registry::IntegrationType;

/// A tenant/agent-specific subset of one integration's catalog.
#[derive(Debug, Clone)]
pub struct AgentToolSelection {
    pub agent_id: String,
    pub integration_type: IntegrationType,
    pub selected_tools: Vec<String>,
    pub enabled: bool,
}

/// Read-only view of stored agent tool selections.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn selection_for(
        &self,
        agent_id: &str,
        integration_type: &IntegrationType,
    ) -> Option<AgentToolSelection>;
}

/// In-memory selection store for development and tests.
#[derive(Default)]
pub struct MemorySelectionStore {
    selections: RwLock<HashMap<(String, IntegrationType), AgentToolSelection>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, selection: AgentToolSelection) {
        let key = (selection.agent_id.clone(), selection.integration_type.clone());
        self.selections
            .write()
            .expect("selection store poisoned")
            .insert(key, selection);
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn selection_for(
        &self,
        agent_id: &str,
        integration_type: &IntegrationType,
    ) -> Option<AgentToolSelection> {
        let key = (agent_id.to_string(), integration_type.clone());
        self.selections
            .read()
            .expect("selection store poisoned")
            .get(&key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_scoped_by_agent_and_type() {
        let store = MemorySelectionStore::new();
        store.insert(AgentToolSelection {
            agent_id: "agent_1".into(),
            integration_type: "shopify".into(),
            selected_tools: vec!["searchProducts".into()],
            enabled: true,
        });

        assert!(store.selection_for("agent_1", &"shopify".into()).await.is_some());
        assert!(store.selection_for("agent_2", &"shopify".into()).await.is_none());
        assert!(store.selection_for("agent_1", &"payments".into()).await.is_none());
    }
}
