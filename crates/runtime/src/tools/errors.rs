use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a tool-level failure, as reported back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    ToolExecutionError,
    Timeout,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UnknownTool => "UnknownTool",
            Self::InvalidArguments => "InvalidArguments",
            Self::ToolExecutionError => "ToolExecutionError",
            Self::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while invoking a tool.
///
/// These never end an exchange: the invoker folds them into a
/// [`ToolCallResult`](super::ToolCallResult) for the model to read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("tool not found: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::UnknownTool(_) => ToolErrorKind::UnknownTool,
            Self::InvalidArguments(_) => ToolErrorKind::InvalidArguments,
            Self::Execution(_) => ToolErrorKind::ToolExecutionError,
            Self::Timeout(_) => ToolErrorKind::Timeout,
        }
    }
}

/// Errors from registering or looking up tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}
