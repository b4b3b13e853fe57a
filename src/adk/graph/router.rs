// SPDX-License-Identifier: MIT

//! Routers - pure functions from state to the next node identifier

use super::END;
use crate::adk::error::WorkflowError;
use crate::adk::model::Role;
use crate::adk::state::ChatState;

/// Decides where a conditional edge leads
pub trait Router: Send + Sync {
    /// Every identifier `route` can return. Checked against the graph at compile time.
    fn targets(&self) -> Vec<String>;

    /// Pick the next node. `from` is the node that just ran.
    fn route(&self, from: &str, state: &ChatState) -> Result<String, WorkflowError>;
}

/// Routes on `state.control.next`, written by the preceding node.
///
/// An absent or blank value resolves to the default node when one is set.
/// A value outside the declared set is always a routing error.
#[derive(Debug, Clone)]
pub struct NextFieldRouter {
    valid: Vec<String>,
    default: Option<String>,
}

impl NextFieldRouter {
    pub fn new<I, S>(valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid: valid.into_iter().map(Into::into).collect(),
            default: None,
        }
    }

    /// Fallback when the routing field is empty; added to the valid set
    pub fn with_default(mut self, node: impl Into<String>) -> Self {
        let node = node.into();
        if !self.valid.contains(&node) {
            self.valid.push(node.clone());
        }
        self.default = Some(node);
        self
    }
}

impl Router for NextFieldRouter {
    fn targets(&self) -> Vec<String> {
        self.valid.clone()
    }

    fn route(&self, from: &str, state: &ChatState) -> Result<String, WorkflowError> {
        let requested = state
            .control
            .next
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        match (requested, &self.default) {
            (Some(next), _) if self.valid.iter().any(|v| v == next) => Ok(next.to_string()),
            (None, Some(default)) => {
                log::info!("Router on '{}': empty routing field, using '{}'", from, default);
                Ok(default.clone())
            }
            (requested, _) => Err(WorkflowError::Routing {
                from: from.to_string(),
                target: requested.unwrap_or_default().to_string(),
                valid: self.valid.clone(),
            }),
        }
    }
}

/// Routes to the tool node while the last assistant message requests tools,
/// otherwise ends the graph.
#[derive(Debug, Clone)]
pub struct ToolsCondition {
    tools_node: String,
}

impl ToolsCondition {
    pub fn new(tools_node: impl Into<String>) -> Self {
        Self {
            tools_node: tools_node.into(),
        }
    }
}

impl Router for ToolsCondition {
    fn targets(&self) -> Vec<String> {
        vec![self.tools_node.clone(), END.to_string()]
    }

    fn route(&self, _from: &str, state: &ChatState) -> Result<String, WorkflowError> {
        let pending = state
            .last_message()
            .is_some_and(|m| m.role == Role::Assistant && m.has_tool_calls());
        Ok(if pending {
            self.tools_node.clone()
        } else {
            END.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::{Message, Part};
    use crate::adk::state::{SlotSchema, StateUpdate};
    use serde_json::json;

    fn state_with_next(next: Option<&str>) -> ChatState {
        let mut state = ChatState::new("Booking", "m", &SlotSchema::new());
        state.control.next = next.map(str::to_string);
        state
    }

    fn booking_router() -> NextFieldRouter {
        NextFieldRouter::new(["hospital_finder", "date_picker", "responder"])
    }

    #[test]
    fn test_routes_to_named_node() {
        let router = booking_router();
        for target in ["hospital_finder", "date_picker", "responder"] {
            let state = state_with_next(Some(target));
            assert_eq!(router.route("supervisor", &state).unwrap(), target);
        }
    }

    #[test]
    fn test_unknown_target_is_routing_error() {
        let router = booking_router().with_default("responder");
        let err = router
            .route("supervisor", &state_with_next(Some("pharmacy")))
            .unwrap_err();
        match err {
            WorkflowError::Routing { from, target, valid } => {
                assert_eq!(from, "supervisor");
                assert_eq!(target, "pharmacy");
                assert_eq!(valid.len(), 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_field_uses_default() {
        let router = booking_router().with_default("responder");
        assert_eq!(
            router.route("supervisor", &state_with_next(None)).unwrap(),
            "responder"
        );
        assert_eq!(
            router.route("supervisor", &state_with_next(Some("  "))).unwrap(),
            "responder"
        );
    }

    #[test]
    fn test_empty_field_without_default_fails() {
        let err = booking_router()
            .route("supervisor", &state_with_next(None))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Routing { ref target, .. } if target.is_empty()));
    }

    #[test]
    fn test_route_is_idempotent() {
        let router = booking_router();
        let state = state_with_next(Some("date_picker"));
        let first = router.route("supervisor", &state).unwrap();
        let second = router.route("supervisor", &state).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_joins_targets() {
        let router = NextFieldRouter::new(["a"]).with_default("b");
        assert_eq!(router.targets(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_tools_condition() {
        let router = ToolsCondition::new("tools");
        let mut state = ChatState::new("OKR", "m", &SlotSchema::new());
        state.apply(StateUpdate::new().message(Message::user("time?")));
        assert_eq!(router.route("chat", &state).unwrap(), END);

        state.apply(StateUpdate::new().message(Message {
            role: Role::Assistant,
            parts: vec![Part::ToolCall {
                id: "1".into(),
                name: "get_datetime_now".into(),
                args: json!({}),
            }],
        }));
        assert_eq!(router.route("chat", &state).unwrap(), "tools");

        state.apply(StateUpdate::new().message(Message::assistant("It is noon.")));
        assert_eq!(router.route("chat", &state).unwrap(), END);
    }
}
