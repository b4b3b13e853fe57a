// SPDX-License-Identifier: MIT

//! Agent nodes - units of work in a workflow graph
//!
//! - `ChatAgent` - conversational node, appends the model's reply
//! - `StructuredAgent` - extracts a typed record and maps it into slots/control
//! - `ToolNode` - dispatches pending tool calls to a registry

mod llm;
mod prompt;
mod structured;
mod tools;

pub use llm::ChatAgent;
pub use prompt::render_template;
pub use structured::{decode_structured, StructuredAgent, StructuredResponse};
pub use tools::ToolNode;

use crate::adk::error::WorkflowError;
use crate::adk::model::{Model, ModelProvider};
use crate::adk::state::{ChatState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default maximum number of node executions per graph invocation
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Request-scoped settings passed to every node of one turn
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Cancels the in-flight node; the turn is then discarded
    pub cancel: CancellationToken,
    /// Use this model instead of the state's `model_selector`
    pub model_override: Option<String>,
    pub max_steps: usize,
    /// Turn number within the session, for log attribution
    pub turn: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            model_override: None,
            max_steps: DEFAULT_MAX_STEPS,
            turn: 0,
        }
    }
}

impl RunConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A node of a workflow graph
#[async_trait]
pub trait AgentNode: Send + Sync {
    /// Stable identifier, unique within a graph
    fn name(&self) -> &str;

    /// Read the state and return a partial update. Must not mutate anything else.
    async fn run(&self, state: &ChatState, config: &RunConfig) -> Result<StateUpdate, WorkflowError>;
}

/// Resolve the model for this turn: explicit override first, then the session selector
pub(crate) fn resolve_model(
    node: &str,
    provider: &dyn ModelProvider,
    state: &ChatState,
    config: &RunConfig,
) -> Result<Arc<dyn Model>, WorkflowError> {
    let name = config
        .model_override
        .as_deref()
        .unwrap_or(state.model_selector.as_str());
    provider
        .model(name)
        .map_err(|e| WorkflowError::collaborator(node, e))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model used by node and graph tests

    use crate::adk::error::{ChatError, Result};
    use crate::adk::model::{GenerationConfig, Message, Model, ModelProvider, Part, Role};
    use crate::adk::tool::Tool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Returns queued responses in order and records every request
    pub struct ScriptedModel {
        responses: Mutex<Vec<Result<Message>>>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<(Vec<Message>, GenerationConfig, Vec<String>)>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<Message>>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn text(reply: &str) -> Result<Message> {
            Ok(Message::assistant(reply))
        }

        pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> Result<Message> {
            Ok(Message {
                role: Role::Assistant,
                parts: vec![Part::ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    args,
                }],
            })
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            history: &[Message],
            config: &GenerationConfig,
            tools: Option<&[Arc<dyn Tool>]>,
        ) -> Result<Message> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let tool_names = tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.name().to_string())
                .collect();
            self.requests
                .lock()
                .unwrap()
                .push((history.to_vec(), config.clone(), tool_names));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ChatError::other("script exhausted")))
        }
    }

    /// Serves the same scripted model for every selector
    pub struct FixedProvider(pub Arc<ScriptedModel>);

    impl ModelProvider for FixedProvider {
        fn model(&self, _name: &str) -> Result<Arc<dyn Model>> {
            Ok(self.0.clone())
        }
    }
}
