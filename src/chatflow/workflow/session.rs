// SPDX-License-Identifier: MIT

//! One conversation with a workflow

use crate::adk::agent::RunConfig;
use crate::adk::error::WorkflowError;
use crate::adk::graph::CompiledGraph;
use crate::adk::model::Message;
use crate::adk::state::ChatState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Owns a session's committed state and drives its turns.
///
/// A turn runs on a copy of the state; the copy replaces the committed
/// state only when the whole graph run succeeds.
pub struct Session {
    id: Uuid,
    graph: Arc<CompiledGraph>,
    state: ChatState,
    max_steps: usize,
    turns: usize,
}

impl Session {
    pub fn new(graph: Arc<CompiledGraph>, state: ChatState, max_steps: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph,
            state,
            max_steps,
            turns: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workflow(&self) -> &str {
        &self.state.workflow
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Number of committed turns
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Select the model used by every node from the next turn on
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.state.model_selector = model.into();
    }

    /// Run one turn for a user message and return the messages it produced.
    ///
    /// On error the committed state is left exactly as it was.
    pub async fn send(
        &mut self,
        text: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, WorkflowError> {
        let turn = self.turns + 1;
        let mut input = self.state.clone();
        input.messages.push(Message::user(text));
        let produced_from = input.messages.len();

        let config = RunConfig {
            cancel,
            model_override: None,
            max_steps: self.max_steps,
            turn,
        };

        match self.graph.invoke(&input, &config).await {
            Ok(next) => {
                let produced = next.messages[produced_from..].to_vec();
                self.state = next;
                self.turns = turn;
                log::info!(
                    "Session {} turn {} committed ({} new messages)",
                    self.id,
                    turn,
                    produced.len()
                );
                Ok(produced)
            }
            Err(e) => {
                log::error!(
                    "Session {} turn {} aborted ({}): {}",
                    self.id,
                    turn,
                    e.kind(),
                    e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::testing::{FixedProvider, ScriptedModel};
    use crate::adk::agent::ChatAgent;
    use crate::adk::error::ChatError;
    use crate::adk::graph::{StateGraph, END};
    use crate::adk::state::SlotSchema;

    fn session(model: Arc<ScriptedModel>) -> Session {
        let mut graph = StateGraph::new("echo");
        graph
            .add_node(
                "chat",
                Arc::new(ChatAgent::new("chat", "Be brief.", Arc::new(FixedProvider(model)))),
            )
            .set_entry_point("chat")
            .add_edge("chat", END);
        let state = ChatState::new("echo", "gpt-4o-mini", &SlotSchema::new());
        Session::new(Arc::new(graph.compile().unwrap()), state, 25)
    }

    #[tokio::test]
    async fn test_commits_successful_turn() {
        let model = ScriptedModel::new(vec![ScriptedModel::text("Hi there")]);
        let mut session = session(model);

        let produced = session.send("hello", CancellationToken::new()).await.unwrap();
        assert_eq!(produced, vec![Message::assistant("Hi there")]);
        assert_eq!(session.state().messages.len(), 2);
        assert_eq!(session.turns(), 1);
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_previous_state() {
        let model = ScriptedModel::new(vec![
            ScriptedModel::text("first answer"),
            Err(ChatError::api("OpenAI", "503")),
        ]);
        let mut session = session(model);
        session.send("one", CancellationToken::new()).await.unwrap();
        let committed = session.state().clone();

        let err = session.send("two", CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), "collaborator_unavailable");
        assert_eq!(session.state(), &committed);
        assert_eq!(session.turns(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_turn_is_discarded() {
        let model = ScriptedModel::new(vec![ScriptedModel::text("never seen")]);
        let mut session = session(model);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session.send("hello", cancel).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Cancelled { .. }));
        assert!(session.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_set_model_applies_to_next_turn() {
        let model = ScriptedModel::new(vec![ScriptedModel::text("ok")]);
        let mut session = session(model);
        session.set_model("gpt-4o");
        session.send("hello", CancellationToken::new()).await.unwrap();
        assert_eq!(session.state().model_selector, "gpt-4o");
    }
}
