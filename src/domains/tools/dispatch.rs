//! Per-request dispatch table.
//!
//! The table is built only from the filtered tool set, before any name is
//! looked up: a tool excluded by filtering is structurally unreachable and
//! answers exactly like a tool that never existed. Handler failures convert
//! to structured error results attached to the single invocation; they never
//! abort the surrounding request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domains::registry::ServerDescriptor;

use super::catalog::{ToolCallEnv, ToolDescriptor};
use super::error::ToolError;

/// Outcome of one tool invocation, in the shape agents consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolCallOutput {
    fn success(value: &serde_json::Value) -> Self {
        Self {
            text: serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            is_error: true,
        }
    }

    /// Render as an MCP-style tool result.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

/// Callable tool set for one invocation request.
pub struct DispatchTable {
    tools: HashMap<String, Arc<ToolDescriptor>>,
    timeout: Duration,
    retries: u32,
}

impl DispatchTable {
    /// Build the table from an already-filtered tool set.
    pub fn build(filtered: Vec<Arc<ToolDescriptor>>, descriptor: &ServerDescriptor) -> Self {
        let tools = filtered
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        Self {
            tools,
            timeout: Duration::from_millis(descriptor.timeout_ms),
            retries: descriptor.retries,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptor lookup; absent for unknown and filtered-out names alike.
    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn listings(&self) -> Vec<serde_json::Value> {
        let mut listings: Vec<_> = self.tools.values().collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        listings.iter().map(|t| t.to_listing()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool with per-call isolation.
    ///
    /// Unknown names (including filtered-out catalog tools) error with one
    /// identical shape. Timeouts retry up to the descriptor's bound, then
    /// report as an execution error inside the result. Handler errors become
    /// error results, never propagated failures.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<ToolCallOutput, ToolError> {
        let Some(descriptor) = self.tools.get(name) else {
            return Err(ToolError::unknown(name));
        };

        let handler = descriptor.handler();
        let attempts = self.retries.saturating_add(1);

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, handler.call(arguments.clone(), env)).await {
                Ok(Ok(value)) => {
                    info!(tool = name, request_id = %env.request_id, "tool call succeeded");
                    return Ok(ToolCallOutput::success(&value));
                }
                Ok(Err(e)) => {
                    // Handler-level failure: structured result, no retry.
                    warn!(tool = name, request_id = %env.request_id, error = %e, "tool call failed");
                    return Ok(ToolCallOutput::error(e.to_string()));
                }
                Err(_) => {
                    warn!(
                        tool = name,
                        attempt,
                        attempts,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "tool call timed out"
                    );
                }
            }
        }

        Ok(ToolCallOutput::error(
            ToolError::Timeout { attempts }.to_string(),
        ))
    }
}
