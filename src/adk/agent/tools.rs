// SPDX-License-Identifier: MIT

//! Tool Node - answers the tool calls of the last assistant message
//!
//! Tool failures never abort the graph: a missing tool, an error, or a
//! timeout becomes an error result the calling agent sees on its next turn.

use super::{AgentNode, RunConfig};
use crate::adk::error::WorkflowError;
use crate::adk::model::{Message, Part, Role, ToolCallRequest};
use crate::adk::registry::ToolRegistry;
use crate::adk::state::{ChatState, StateUpdate};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

pub struct ToolNode {
    name: String,
    registry: ToolRegistry,
    timeout: Duration,
    /// Successful results of these tools are also written into a slot
    result_slots: HashMap<String, String>,
}

impl ToolNode {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            timeout: Duration::from_secs(30),
            result_slots: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Store successful results of `tool` into `slot` (through the slot's reducer)
    pub fn with_result_slot(mut self, tool: impl Into<String>, slot: impl Into<String>) -> Self {
        self.result_slots.insert(tool.into(), slot.into());
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run every request concurrently and return one tool message per request,
    /// in request order.
    pub async fn dispatch(&self, calls: &[ToolCallRequest]) -> StateUpdate {
        let results = futures::future::join_all(calls.iter().map(|call| self.invoke(call))).await;

        let mut update = StateUpdate::new();
        for (call, result) in calls.iter().zip(results) {
            let (response, is_error) = match result {
                Ok(value) => {
                    if let Some(slot) = self.result_slots.get(&call.name) {
                        update = update.slot(slot.clone(), value.clone());
                    }
                    (value, false)
                }
                Err(e) => {
                    log::warn!("Tool node {}: {}", self.name, e);
                    (json!({ "error": e.to_string(), "tool": call.name }), true)
                }
            };

            update = update.message(Message {
                role: Role::Tool,
                parts: vec![Part::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    response,
                    is_error,
                }],
            });
        }
        update
    }

    async fn invoke(&self, call: &ToolCallRequest) -> Result<Value, WorkflowError> {
        let tool = self.registry.get(&call.name).ok_or_else(|| {
            WorkflowError::tool_dispatch(&call.name, "tool is not available in this workflow")
        })?;

        log::info!("Tool call: {} {}", call.name, call.args);
        match tokio::time::timeout(self.timeout, tool.execute(call.args.clone())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(WorkflowError::tool_dispatch(&call.name, e)),
            Err(_) => Err(WorkflowError::tool_dispatch(
                &call.name,
                format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}

#[async_trait]
impl AgentNode for ToolNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &ChatState, _config: &RunConfig) -> Result<StateUpdate, WorkflowError> {
        let calls = state
            .last_message()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.tool_calls())
            .unwrap_or_default();

        if calls.is_empty() {
            log::warn!("Tool node {} ran without pending tool calls", self.name);
            return Ok(StateUpdate::new());
        }

        Ok(self.dispatch(&calls).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::{ChatError, Result};
    use crate::adk::state::{FieldType, ReducerType, SlotSchema};
    use crate::adk::tool::Tool;
    use once_cell::sync::Lazy;
    use std::sync::Arc;

    static EMPTY_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object", "properties": {}}));

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes its arguments"
        }
        fn schema(&self) -> &Value {
            &EMPTY_SCHEMA
        }
        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(json!({ "echo": args }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn schema(&self) -> &Value {
            &EMPTY_SCHEMA
        }
        async fn execute(&self, _args: Value) -> Result<Value> {
            Err(ChatError::other("quota exceeded"))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Never finishes in time"
        }
        fn schema(&self) -> &Value {
            &EMPTY_SCHEMA
        }
        async fn execute(&self, _args: Value) -> Result<Value> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!(null))
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    fn state_with_calls(calls: &[ToolCallRequest]) -> ChatState {
        let schema = SlotSchema::new().slot("okr_data", FieldType::Array, ReducerType::Append);
        let mut state = ChatState::new("OKR", "m", &schema);
        state.messages.push(Message::user("hi"));
        state.messages.push(Message {
            role: Role::Assistant,
            parts: calls
                .iter()
                .map(|c| Part::ToolCall {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    args: c.args.clone(),
                })
                .collect(),
        });
        state
    }

    fn result_part(msg: &Message) -> (&str, &str, &Value, bool) {
        match &msg.parts[0] {
            Part::ToolResult {
                id,
                name,
                response,
                is_error,
            } => (id.as_str(), name.as_str(), response, *is_error),
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_tool_yields_one_failure_record() {
        let node = ToolNode::new("tools", ToolRegistry::empty());
        let calls = [call("c1", "list_spreadsheets", json!({"folder": "X"}))];
        let mut state = state_with_calls(&calls);
        let before = state.messages.len();

        let update = node.run(&state, &RunConfig::default()).await.unwrap();
        state.apply(update);

        assert_eq!(state.messages.len(), before + 1);
        let (id, name, response, is_error) = result_part(state.messages.last().unwrap());
        assert_eq!(id, "c1");
        assert_eq!(name, "list_spreadsheets");
        assert!(is_error);
        assert!(response["error"].as_str().unwrap().contains("list_spreadsheets"));
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let registry = ToolRegistry::new([
            Arc::new(EchoTool) as Arc<dyn Tool>,
            Arc::new(FailingTool),
        ]);
        let node = ToolNode::new("tools", registry);
        let calls = [
            call("a", "broken", json!({})),
            call("b", "echo", json!({"n": 1})),
            call("c", "missing", json!({})),
            call("d", "echo", json!({"n": 2})),
        ];

        let update = node.dispatch(&calls).await;
        assert_eq!(update.messages.len(), 4);

        let ids: Vec<&str> = update.messages.iter().map(|m| result_part(m).0).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);

        let errors: Vec<bool> = update.messages.iter().map(|m| result_part(m).3).collect();
        assert_eq!(errors, vec![true, false, true, false]);
        assert_eq!(result_part(&update.messages[3]).2["echo"]["n"], 2);
        assert!(result_part(&update.messages[0]).2["error"]
            .as_str()
            .unwrap()
            .contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure_record() {
        let node = ToolNode::new("tools", ToolRegistry::new([Arc::new(SlowTool) as Arc<dyn Tool>]))
            .with_timeout(Duration::from_millis(20));
        let update = node.dispatch(&[call("s", "slow", json!({}))]).await;
        let (_, _, response, is_error) = result_part(&update.messages[0]);
        assert!(is_error);
        assert!(response["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_result_slot_receives_successful_results() {
        let node = ToolNode::new("tools", ToolRegistry::new([Arc::new(EchoTool) as Arc<dyn Tool>]))
            .with_result_slot("echo", "okr_data");
        let calls = [call("a", "echo", json!({"sheet": 1}))];
        let mut state = state_with_calls(&calls);

        let update = node.run(&state, &RunConfig::default()).await.unwrap();
        state.apply(update);

        assert_eq!(state.slot("okr_data"), Some(&json!([{"echo": {"sheet": 1}}])));
    }

    #[tokio::test]
    async fn test_no_pending_calls_is_a_no_op() {
        let node = ToolNode::new("tools", ToolRegistry::empty());
        let mut state = state_with_calls(&[]);
        state.messages.push(Message::assistant("done"));

        let update = node.run(&state, &RunConfig::default()).await.unwrap();
        assert!(update.is_empty());
    }
}
