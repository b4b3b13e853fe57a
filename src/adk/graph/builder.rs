// SPDX-License-Identifier: MIT

//! Graph construction and construction-time validation

use super::executor::{CompiledGraph, Edge};
use super::router::Router;
use super::END;
use crate::adk::agent::AgentNode;
use crate::adk::error::GraphError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Builder for a workflow graph
pub struct StateGraph {
    name: String,
    nodes: Vec<(String, Arc<dyn AgentNode>)>,
    entry: Option<String>,
    edges: Vec<(String, Edge)>,
}

impl StateGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            entry: None,
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn AgentNode>) -> &mut Self {
        self.nodes.push((id.into(), node));
        self
    }

    pub fn set_entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        self.entry = Some(id.into());
        self
    }

    /// Unconditional edge; `to` may be [`END`]
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), Edge::Static(to.into())));
        self
    }

    /// Edge whose target is chosen by `router` after `from` runs
    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<String>,
        router: Arc<dyn Router>,
    ) -> &mut Self {
        self.edges.push((from.into(), Edge::Conditional(router)));
        self
    }

    /// Validate the graph and freeze it.
    ///
    /// Every identifier a router declares must be a node or [`END`], so a bad
    /// route is caught here rather than on first traversal. A node without an
    /// outgoing edge is terminal.
    pub fn compile(&self) -> Result<CompiledGraph, GraphError> {
        let mut nodes: HashMap<String, Arc<dyn AgentNode>> = HashMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        for (id, node) in &self.nodes {
            if id.is_empty() || id == END {
                return Err(GraphError::ReservedNode(id.clone()));
            }
            if node.name() != id {
                return Err(GraphError::NameMismatch {
                    id: id.clone(),
                    name: node.name().to_string(),
                });
            }
            if nodes.insert(id.clone(), node.clone()).is_some() {
                return Err(GraphError::DuplicateNode(id.clone()));
            }
            order.push(id.clone());
        }

        let entry = self.entry.clone().ok_or(GraphError::MissingEntry)?;
        if !nodes.contains_key(&entry) {
            return Err(GraphError::UnknownEntry(entry));
        }

        let is_target = |id: &str| id == END || nodes.contains_key(id);
        let mut edges: HashMap<String, Edge> = HashMap::new();
        for (from, edge) in &self.edges {
            if !nodes.contains_key(from) {
                let to = match edge {
                    Edge::Static(to) => to.clone(),
                    Edge::Conditional(_) => END.to_string(),
                };
                return Err(GraphError::UnknownEdgeNode {
                    from: from.clone(),
                    to,
                });
            }
            match edge {
                Edge::Static(to) if !is_target(to) => {
                    return Err(GraphError::UnknownEdgeNode {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                Edge::Conditional(router) => {
                    if let Some(target) = router.targets().into_iter().find(|t| !is_target(t)) {
                        return Err(GraphError::UndeclaredRoute {
                            from: from.clone(),
                            target,
                        });
                    }
                }
                _ => {}
            }
            if edges.insert(from.clone(), edge.clone()).is_some() {
                return Err(GraphError::ConflictingEdges(from.clone()));
            }
        }

        // Breadth-first walk from the entry over every possible edge
        let mut seen: HashSet<String> = HashSet::from([entry.clone()]);
        let mut queue = VecDeque::from([entry.clone()]);
        while let Some(id) = queue.pop_front() {
            let targets = match edges.get(&id) {
                Some(Edge::Static(to)) => vec![to.clone()],
                Some(Edge::Conditional(router)) => router.targets(),
                None => vec![],
            };
            for target in targets {
                if target != END && seen.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }
        if let Some(unreachable) = order.iter().find(|id| !seen.contains(*id)) {
            return Err(GraphError::Unreachable(unreachable.clone()));
        }

        log::debug!(
            "Compiled graph '{}': {} nodes, entry '{}'",
            self.name,
            order.len(),
            entry
        );
        Ok(CompiledGraph::new(self.name.clone(), entry, order, nodes, edges))
    }
}
