//! Short-TTL credential cache.
//!
//! Keyed strictly by (organization, integration type) so one tenant's
//! credentials can never leak into another tenant's resolution. Only
//! successful, fully-validated resolutions are cached.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domains::registry::IntegrationType;

use super::record::CredentialRecord;

struct CacheEntry {
    record: CredentialRecord,
    inserted_at: Instant,
}

/// In-memory TTL cache for resolved credentials.
///
/// A zero TTL disables the cache entirely.
pub struct CredentialCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, IntegrationType), CacheEntry>>,
}

impl CredentialCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(
        &self,
        organization_id: &str,
        integration_type: &IntegrationType,
    ) -> Option<CredentialRecord> {
        if !self.is_enabled() {
            return None;
        }

        let key = (organization_id.to_string(), integration_type.clone());
        let entries = self.entries.read().expect("credential cache poisoned");
        let entry = entries.get(&key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.record.clone())
    }

    pub fn put(&self, record: CredentialRecord) {
        if !self.is_enabled() {
            return;
        }

        let key = (
            record.organization_id().to_string(),
            record.integration_type().clone(),
        );
        let mut entries = self.entries.write().expect("credential cache poisoned");
        entries.insert(
            key,
            CacheEntry {
                record,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the cached record for one tenant/integration pair.
    ///
    /// Called when an integration record is updated so stale secrets are not
    /// served for the rest of the TTL window.
    pub fn invalidate(&self, organization_id: &str, integration_type: &IntegrationType) {
        let key = (organization_id.to_string(), integration_type.clone());
        let mut entries = self.entries.write().expect("credential cache poisoned");
        if entries.remove(&key).is_some() {
            debug!(
                organization_id,
                integration_type = %integration_type,
                "invalidated cached credentials"
            );
        }
    }

    /// Remove expired entries.
    pub fn sweep(&self) {
        if !self.is_enabled() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.entries.write().expect("credential cache poisoned");
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("credential cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
