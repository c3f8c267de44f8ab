//! Error types for the toolpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Model-side failures and tool-side failures are kept apart: tool errors
//! are turned into transcript data by the executor, model errors travel up
//! the stack to the operator.

use thiserror::Error;

/// The top-level error type for an exchange.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote model errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors (only surfaced outside the executor, e.g. at registration) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The operator interrupted the exchange.
    #[error("Exchange cancelled")]
    Cancelled,

    #[error("Exceeded {limit} model calls without a final reply")]
    IterationLimit { limit: u32 },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures signalled by a model client adapter.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Connection reset, timeout, 5xx. The same request may be retried.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// The remote answered with something we cannot interpret.
    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Model client not configured: {0}")]
    NotConfigured(String),
}

impl ModelError {
    /// Whether the orchestration loop may re-send the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::TransientNetwork(_) | ModelError::RateLimited { .. }
        )
    }
}

/// Failures around tool registration and execution.
///
/// The `Display` text of these errors is what the model sees in a failed
/// tool result, so messages are phrased for it.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("invalid schema for tool {tool_name}: {reason}")]
    InvalidSchema { tool_name: String, reason: String },

    #[error("invalid arguments for {tool_name}: {reason}")]
    Validation { tool_name: String, reason: String },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("permission denied: {path}: {reason}")]
    PermissionDenied { path: String, reason: String },

    #[error("file is not valid UTF-8 text: {0}")]
    InvalidEncoding(String),

    #[error("path rejected: {0}")]
    SandboxViolation(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("{tool_name} panicked: {reason}")]
    Panicked { tool_name: String, reason: String },
}

impl ToolError {
    /// Build an execution failure for `tool_name`.
    pub fn failed(tool_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Map an I/O error on `path` to the most descriptive tool error.
    pub fn from_io(tool_name: &str, path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => ToolError::PermissionDenied {
                path: path.to_string(),
                reason: err.to_string(),
            },
            std::io::ErrorKind::InvalidData => ToolError::InvalidEncoding(path.to_string()),
            _ => ToolError::failed(tool_name, format!("{path}: {err}")),
        }
    }
}
