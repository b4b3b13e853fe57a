// SPDX-License-Identifier: MIT

//! Typed error handling for chatflow-rs
//!
//! Three layers of errors:
//! - [`GraphError`] - a workflow graph is malformed (raised by `compile`)
//! - [`WorkflowError`] - a turn failed while the graph was running
//! - [`ChatError`] - top-level error for sessions, tools and the front end

use thiserror::Error;

/// Construction-time graph validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' is declared more than once")]
    DuplicateNode(String),

    #[error("Node identifier '{0}' is reserved")]
    ReservedNode(String),

    /// Errors and logs name a node by `AgentNode::name`, so it must match its id
    #[error("Node '{id}' reports its name as '{name}'")]
    NameMismatch { id: String, name: String },

    #[error("Graph has no entry point")]
    MissingEntry,

    #[error("Entry point '{0}' is not a node of this graph")]
    UnknownEntry(String),

    /// A static or conditional edge starts or ends at an undeclared node
    #[error("Edge {from} -> {to} references an unknown node")]
    UnknownEdgeNode { from: String, to: String },

    /// A router may return a target that is not a node of the graph
    #[error("Router on '{from}' may route to undeclared node '{target}'")]
    UndeclaredRoute { from: String, target: String },

    #[error("Node '{0}' has more than one outgoing edge")]
    ConflictingEdges(String),

    #[error("Node '{0}' is not reachable from the entry point")]
    Unreachable(String),
}

/// Turn-level failures raised while a workflow graph runs
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The model's output does not match the declared structured shape
    #[error("Node '{node}' could not extract structured output: {reason}")]
    Extraction { node: String, reason: String },

    /// A routing field names a node that the graph does not declare
    #[error("Node '{from}' routed to unknown node '{target}' (valid: {valid:?})")]
    Routing {
        from: String,
        target: String,
        valid: Vec<String>,
    },

    #[error("Step limit of {limit} reached without reaching the end of the graph")]
    StepLimitExceeded { limit: usize },

    /// A tool is missing or failed. Tool nodes fold this into a message.
    #[error("Tool '{tool}' failed: {message}")]
    ToolDispatch { tool: String, message: String },

    /// The model call itself failed or timed out
    #[error("Model collaborator unavailable in node '{node}': {message}")]
    CollaboratorUnavailable { node: String, message: String },

    #[error("Turn cancelled while running node '{node}'")]
    Cancelled { node: String },

    #[error("Invalid graph: {0}")]
    InvalidGraph(#[from] GraphError),
}

impl WorkflowError {
    pub fn extraction(node: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extraction {
            node: node.into(),
            reason: reason.to_string(),
        }
    }

    pub fn collaborator(node: impl Into<String>, message: impl ToString) -> Self {
        Self::CollaboratorUnavailable {
            node: node.into(),
            message: message.to_string(),
        }
    }

    pub fn tool_dispatch(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::ToolDispatch {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Short machine-readable kind, used by the front end
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction_failure",
            Self::Routing { .. } => "routing_error",
            Self::StepLimitExceeded { .. } => "step_limit_exceeded",
            Self::ToolDispatch { .. } => "tool_dispatch_failure",
            Self::CollaboratorUnavailable { .. } => "collaborator_unavailable",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidGraph(_) => "invalid_graph",
        }
    }
}

/// Top-level error type for chatflow-rs
#[derive(Debug, Error)]
pub enum ChatError {
    /// API errors from external services (LLM providers, Google APIs)
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, missing credential files)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for ChatError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for ChatError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_message_lists_valid_targets() {
        let err = WorkflowError::Routing {
            from: "supervisor".into(),
            target: "pharmacy".into(),
            valid: vec!["responder".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("pharmacy"));
        assert!(msg.contains("responder"));
        assert_eq!(err.kind(), "routing_error");
    }

    #[test]
    fn test_graph_error_converts_into_chat_error() {
        let err: ChatError = GraphError::MissingEntry.into();
        assert!(matches!(err, ChatError::Graph(GraphError::MissingEntry)));
    }

    #[test]
    fn test_workflow_error_converts_into_chat_error() {
        let err: ChatError = WorkflowError::StepLimitExceeded { limit: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Step limit of 3 reached without reaching the end of the graph"
        );
    }
}
