// SPDX-License-Identifier: MIT

//! Graph executor - runs one conversational turn

use super::router::Router;
use super::END;
use crate::adk::agent::{AgentNode, RunConfig};
use crate::adk::error::WorkflowError;
use crate::adk::state::ChatState;
use std::collections::HashMap;
use std::sync::Arc;

/// Outgoing edge of a node
#[derive(Clone)]
pub(crate) enum Edge {
    Static(String),
    Conditional(Arc<dyn Router>),
}

/// A validated, immutable workflow graph
pub struct CompiledGraph {
    name: String,
    entry: String,
    order: Vec<String>,
    nodes: HashMap<String, Arc<dyn AgentNode>>,
    edges: HashMap<String, Edge>,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl CompiledGraph {
    pub(crate) fn new(
        name: String,
        entry: String,
        order: Vec<String>,
        nodes: HashMap<String, Arc<dyn AgentNode>>,
        edges: HashMap<String, Edge>,
    ) -> Self {
        Self {
            name,
            entry,
            order,
            nodes,
            edges,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Node identifiers in declaration order
    pub fn node_ids(&self) -> &[String] {
        &self.order
    }

    /// Run the graph from the entry node until it reaches the end marker.
    ///
    /// Nodes work on a copy of `state`; the copy is returned only when the
    /// whole turn succeeds, so a failed or cancelled turn leaves the caller's
    /// state untouched. At most `config.max_steps` nodes run per call.
    pub async fn invoke(
        &self,
        state: &ChatState,
        config: &RunConfig,
    ) -> Result<ChatState, WorkflowError> {
        let mut working = state.clone();
        let mut current = self.entry.clone();
        let mut steps = 0;

        while current != END {
            if steps >= config.max_steps {
                log::error!(
                    "Graph '{}' turn {}: step limit {} reached at '{}'",
                    self.name,
                    config.turn,
                    config.max_steps,
                    current
                );
                return Err(WorkflowError::StepLimitExceeded {
                    limit: config.max_steps,
                });
            }
            steps += 1;

            let node = self.nodes.get(&current).ok_or_else(|| WorkflowError::Routing {
                from: current.clone(),
                target: current.clone(),
                valid: self.order.clone(),
            })?;

            log::info!(
                "Graph '{}' turn {} step {}: running '{}'",
                self.name,
                config.turn,
                steps,
                current
            );

            let update = tokio::select! {
                biased;
                _ = config.cancel.cancelled() => {
                    log::warn!("Graph '{}' turn {}: cancelled in '{}'", self.name, config.turn, current);
                    return Err(WorkflowError::Cancelled { node: current.clone() });
                }
                result = node.run(&working, config) => result.map_err(|e| {
                    log::error!("Graph '{}' turn {}: node '{}' failed: {}", self.name, config.turn, current, e);
                    e
                })?,
            };
            working.apply(update);

            current = self.next_node(&current, &working)?;
        }

        log::info!(
            "Graph '{}' turn {} finished after {} steps",
            self.name,
            config.turn,
            steps
        );
        Ok(working)
    }

    fn next_node(&self, from: &str, state: &ChatState) -> Result<String, WorkflowError> {
        let target = match self.edges.get(from) {
            Some(Edge::Static(to)) => to.clone(),
            Some(Edge::Conditional(router)) => router.route(from, state)?,
            None => END.to_string(),
        };

        if target != END && !self.nodes.contains_key(&target) {
            return Err(WorkflowError::Routing {
                from: from.to_string(),
                target,
                valid: self.order.clone(),
            });
        }
        Ok(target)
    }
}
