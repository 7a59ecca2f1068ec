//! Request-scoped attribution context.
//!
//! One `RequestContext` is established per inbound request or agent run and
//! is implicitly readable by everything in that call tree, without threading
//! it through every function signature. The mechanism is tokio task-local
//! storage, so concurrent call trees can never observe each other's context:
//! each `with_request_context` scope owns its own binding, and nested scopes
//! shadow outer ones for the inner future only.
//!
//! Amendments made through [`amend_context`] mutate the current frame's
//! binding in place; they are visible to the rest of that frame and its
//! descendants, never retroactively to ancestors or siblings. Task locals do
//! not cross `tokio::spawn` - spawned branches must be bridged explicitly
//! with a cloned context.

use std::cell::RefCell;
use std::future::Future;

/// Attribution identity for one request/agent-run call tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub organization_id: String,
    pub agent_id: Option<String>,
    pub conversation_id: Option<String>,
}

impl RequestContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            agent_id: None,
            conversation_id: None,
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

tokio::task_local! {
    static REQUEST_CONTEXT: RefCell<RequestContext>;
}

/// Run a future with the given context established for its call tree.
pub async fn with_request_context<F>(ctx: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT.scope(RefCell::new(ctx), fut).await
}

/// Snapshot of the current frame's context, if one is established.
pub fn current_context() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(|c| c.borrow().clone()).ok()
}

/// Amend the current frame's context in place.
///
/// Returns `false` when called outside any context frame. The amendment is
/// seen by the rest of this frame and its descendants; ancestor and sibling
/// frames keep their own bindings.
pub fn amend_context(f: impl FnOnce(&mut RequestContext)) -> bool {
    REQUEST_CONTEXT.try_with(|c| f(&mut c.borrow_mut())).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_context_outside_frame() {
        assert!(current_context().is_none());
        assert!(!amend_context(|_| {}));
    }

    #[tokio::test]
    async fn test_context_visible_in_frame() {
        let seen = with_request_context(RequestContext::new("org_1"), async {
            current_context().map(|c| c.organization_id)
        })
        .await;
        assert_eq!(seen.as_deref(), Some("org_1"));
        assert!(current_context().is_none(), "context must not leak the frame");
    }

    #[tokio::test]
    async fn test_concurrent_frames_are_isolated() {
        // Two interleaving call trees; neither may ever see the other's
        // organization at any await point.
        async fn observe(org: &str) -> bool {
            with_request_context(RequestContext::new(org), async {
                for _ in 0..50 {
                    tokio::time::sleep(std::time::Duration::from_micros(50)).await;
                    let seen = current_context().expect("context present");
                    if seen.organization_id != org {
                        return false;
                    }
                }
                true
            })
            .await
        }

        let (a, b) = tokio::join!(
            tokio::spawn(observe("org_a")),
            tokio::spawn(observe("org_b"))
        );
        assert!(a.unwrap(), "org_a observed a foreign context");
        assert!(b.unwrap(), "org_b observed a foreign context");
    }

    #[tokio::test]
    async fn test_amendment_visible_to_descendants_only() {
        with_request_context(RequestContext::new("org_1"), async {
            async fn nested() -> Option<String> {
                amend_context(|ctx| ctx.conversation_id = Some("conv_1".into()));
                current_context().and_then(|c| c.conversation_id)
            }

            // Same frame: amendment applies to this binding.
            assert_eq!(nested().await.as_deref(), Some("conv_1"));
            assert_eq!(
                current_context().and_then(|c| c.conversation_id).as_deref(),
                Some("conv_1")
            );

            // A shadowing child frame amends its own copy; when it ends, the
            // outer frame's value is back untouched.
            let mut child = current_context().unwrap();
            child.conversation_id = Some("conv_child".into());
            with_request_context(child, async {
                amend_context(|ctx| ctx.conversation_id = Some("conv_rewritten".into()));
            })
            .await;
            assert_eq!(
                current_context().and_then(|c| c.conversation_id).as_deref(),
                Some("conv_1"),
                "inner frame amendments must not reach the ancestor"
            );
        })
        .await;
    }
}
