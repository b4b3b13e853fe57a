// SPDX-License-Identifier: MIT

//! Chat Agent - conversational node with optional tool calling
//!
//! Sends the rendered system prompt plus the full history to the model and
//! appends the reply. If the reply requests tools, a downstream `ToolNode`
//! answers them and control comes back here.

use super::prompt::render_template;
use super::{resolve_model, AgentNode, RunConfig};
use crate::adk::error::WorkflowError;
use crate::adk::model::{GenerationConfig, Message, ModelProvider, Role};
use crate::adk::registry::ToolRegistry;
use crate::adk::state::{ChatState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ChatAgent {
    name: String,
    template: String,
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    generation: GenerationConfig,
}

impl ChatAgent {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            provider,
            tools: ToolRegistry::empty(),
            generation: GenerationConfig::default(),
        }
    }

    /// Offer these tools to the model on every call
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
}

#[async_trait]
impl AgentNode for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &ChatState, config: &RunConfig) -> Result<StateUpdate, WorkflowError> {
        let model = resolve_model(&self.name, self.provider.as_ref(), state, config)?;

        let mut history = Vec::with_capacity(state.messages.len() + 1);
        history.push(Message::system(render_template(&self.template, state)));
        history.extend(state.messages.iter().cloned());

        let tools = (!self.tools.is_empty()).then(|| self.tools.tools());
        let mut reply = model
            .generate(&history, &self.generation, tools)
            .await
            .map_err(|e| WorkflowError::collaborator(&self.name, e))?;

        if reply.parts.is_empty() {
            return Err(WorkflowError::extraction(
                &self.name,
                "model returned an empty message",
            ));
        }
        reply.role = Role::Assistant;

        let text = reply.text_content();
        log::info!(
            "Agent {} replied (tool calls: {}, preview: '{}')",
            self.name,
            reply.tool_calls().len(),
            text.chars().take(100).collect::<String>()
        );

        Ok(StateUpdate::new().message(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::testing::{FixedProvider, ScriptedModel};
    use crate::adk::error::ChatError;
    use crate::adk::model::Part;
    use crate::adk::state::{FieldType, ReducerType, SlotSchema};
    use serde_json::json;

    fn state() -> ChatState {
        let schema = SlotSchema::new().slot("hospital", FieldType::String, ReducerType::Overwrite);
        let mut state = ChatState::new("Booking", "gpt-4o-mini", &schema);
        state.apply(StateUpdate::new().slot("hospital", "BV Ung Bướu"));
        state.messages.push(Message::user("Book me a visit"));
        state
    }

    #[tokio::test]
    async fn test_appends_exactly_one_assistant_message() {
        let model = ScriptedModel::new(vec![ScriptedModel::text("Which date suits you?")]);
        let agent = ChatAgent::new(
            "responder",
            "Hospital: {hospital}",
            Arc::new(FixedProvider(model.clone())),
        );

        let update = agent.run(&state(), &RunConfig::default()).await.unwrap();
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].role, Role::Assistant);
        assert_eq!(update.messages[0].text_content(), "Which date suits you?");
        assert!(update.next.is_none());

        let requests = model.requests.lock().unwrap();
        let (history, config, tools) = &requests[0];
        assert_eq!(history[0], Message::system("Hospital: BV Ung Bướu"));
        assert_eq!(history[1], Message::user("Book me a visit"));
        assert!(config.response_format.is_none());
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_reply_is_kept() {
        let model = ScriptedModel::new(vec![ScriptedModel::tool_call(
            "call_1",
            "get_datetime_now",
            json!({}),
        )]);
        let agent = ChatAgent::new("chat", "OKR", Arc::new(FixedProvider(model)));

        let update = agent.run(&state(), &RunConfig::default()).await.unwrap();
        assert!(matches!(update.messages[0].parts[0], Part::ToolCall { .. }));
    }

    #[tokio::test]
    async fn test_model_failure_is_collaborator_unavailable() {
        let model = ScriptedModel::new(vec![Err(ChatError::api("OpenAI", "timeout"))]);
        let agent = ChatAgent::new("responder", "", Arc::new(FixedProvider(model)));

        let err = agent.run(&state(), &RunConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::CollaboratorUnavailable { ref node, .. } if node == "responder"
        ));
    }

    #[tokio::test]
    async fn test_empty_reply_is_rejected() {
        let model = ScriptedModel::new(vec![Ok(Message {
            role: Role::Assistant,
            parts: vec![],
        })]);
        let agent = ChatAgent::new("responder", "", Arc::new(FixedProvider(model)));

        let err = agent.run(&state(), &RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Extraction { .. }));
    }
}
