//! Usage attribution sink.
//!
//! Observes invocation-completion events and forwards billing records to the
//! usage ledger collaborator. Attribution comes from the event itself first,
//! then from the propagated request context; an event with no resolvable
//! organization is dropped with a warning, never attributed to a default
//! tenant. Ledger delivery is fire-and-forget: delivery failures are logged
//! and swallowed so they cannot slow the user-facing response path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::core::context;

/// A billing-relevant record of consumed resources. Immutable; forwarded to
/// the ledger exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    #[serde(rename = "organizationId")]
    pub organization_id: String,
    #[serde(rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub model: String,
    #[serde(rename = "inputTokens")]
    pub input_tokens: u64,
    #[serde(rename = "outputTokens")]
    pub output_tokens: u64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// A completion observation before attribution. Attribution fields are
/// optional here; the recorder fills them from the request context when the
/// event does not carry them.
#[derive(Debug, Clone, Default)]
pub struct CompletionEvent {
    pub organization_id: Option<String>,
    pub agent_id: Option<String>,
    pub conversation_id: Option<String>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub source: String,
}

/// Ledger delivery error.
#[derive(Debug, Error)]
#[error("usage ledger error: {0}")]
pub struct LedgerError(pub String);

/// The usage ledger collaborator.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn record(&self, event: UsageEvent) -> Result<(), LedgerError>;
}

/// Ledger that logs records; the default when no real ledger is wired.
pub struct TracingLedger;

#[async_trait]
impl UsageLedger for TracingLedger {
    async fn record(&self, event: UsageEvent) -> Result<(), LedgerError> {
        tracing::info!(
            organization_id = %event.organization_id,
            model = %event.model,
            input_tokens = event.input_tokens,
            output_tokens = event.output_tokens,
            source = %event.source,
            "usage recorded"
        );
        Ok(())
    }
}

/// In-memory ledger for development and tests.
#[derive(Default)]
pub struct MemoryLedger {
    events: std::sync::Mutex<Vec<UsageEvent>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().expect("ledger poisoned").clone()
    }
}

#[async_trait]
impl UsageLedger for MemoryLedger {
    async fn record(&self, event: UsageEvent) -> Result<(), LedgerError> {
        self.events.lock().expect("ledger poisoned").push(event);
        Ok(())
    }
}

/// Resolves attribution and forwards valid events to the ledger.
pub struct UsageRecorder {
    ledger: Arc<dyn UsageLedger>,
}

impl UsageRecorder {
    pub fn new(ledger: Arc<dyn UsageLedger>) -> Self {
        Self { ledger }
    }

    /// Observe a completion.
    ///
    /// Returns the delivery task handle when the event was attributed, `None`
    /// when it was dropped. Zero-token events are emitted like any other -
    /// billing reconciliation needs the row, and suppression would hide
    /// cancelled work.
    pub fn observe(&self, completion: CompletionEvent) -> Option<tokio::task::JoinHandle<()>> {
        let ctx = context::current_context();

        let organization_id = completion
            .organization_id
            .filter(|id| !id.is_empty())
            .or_else(|| ctx.as_ref().map(|c| c.organization_id.clone()))
            .filter(|id| !id.is_empty());

        let Some(organization_id) = organization_id else {
            warn!(
                model = %completion.model,
                source = %completion.source,
                "dropping usage event: no resolvable organization"
            );
            return None;
        };

        let event = UsageEvent {
            organization_id,
            agent_id: completion
                .agent_id
                .or_else(|| ctx.as_ref().and_then(|c| c.agent_id.clone())),
            conversation_id: completion
                .conversation_id
                .or_else(|| ctx.as_ref().and_then(|c| c.conversation_id.clone())),
            model: completion.model,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            source: completion.source,
            timestamp: Utc::now(),
        };

        // Fire-and-forget: only the delivery layer is best-effort.
        let ledger = self.ledger.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = ledger.record(event).await {
                warn!(error = %e, "usage ledger delivery failed");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{RequestContext, with_request_context};

    fn completion(org: Option<&str>) -> CompletionEvent {
        CompletionEvent {
            organization_id: org.map(String::from),
            model: "gpt-4o".into(),
            input_tokens: 120,
            output_tokens: 40,
            source: "agent".into(),
            ..CompletionEvent::default()
        }
    }

    #[tokio::test]
    async fn test_event_attribution_wins_over_context() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = UsageRecorder::new(ledger.clone());

        let handle = with_request_context(RequestContext::new("org_ctx"), async {
            recorder.observe(completion(Some("org_event")))
        })
        .await
        .expect("attributed");
        handle.await.unwrap();

        let events = ledger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].organization_id, "org_event");
        assert_eq!(events[0].input_tokens, 120);
        assert_eq!(events[0].output_tokens, 40);
        assert_eq!(events[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_context_fallback() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = UsageRecorder::new(ledger.clone());

        let mut ctx = RequestContext::new("org_1");
        ctx.agent_id = Some("agent_1".into());

        let handle = with_request_context(ctx, async { recorder.observe(completion(None)) })
            .await
            .expect("attributed from context");
        handle.await.unwrap();

        let events = ledger.events();
        assert_eq!(events[0].organization_id, "org_1");
        assert_eq!(events[0].agent_id.as_deref(), Some("agent_1"));
    }

    #[tokio::test]
    async fn test_unattributable_event_dropped() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = UsageRecorder::new(ledger.clone());

        // No event org, no context: dropped, zero records.
        assert!(recorder.observe(completion(None)).is_none());
        assert!(ledger.events().is_empty());
    }

    #[tokio::test]
    async fn test_zero_token_event_still_emitted() {
        let ledger = Arc::new(MemoryLedger::new());
        let recorder = UsageRecorder::new(ledger.clone());

        let mut event = completion(Some("org_1"));
        event.input_tokens = 0;
        event.output_tokens = 0;

        recorder.observe(event).expect("attributed").await.unwrap();
        assert_eq!(ledger.events().len(), 1);
        assert_eq!(ledger.events()[0].input_tokens, 0);
    }
}
