//! Tool-specific error types.

use thiserror::Error;

/// Errors that can occur during tool dispatch and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool name is not in the dispatch table. Filtered-out catalog
    /// tools answer with this same shape so catalog membership never leaks.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The handler failed; isolated to this single invocation.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The upstream call timed out after every configured retry.
    #[error("Tool execution timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
