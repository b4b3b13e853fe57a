// SPDX-License-Identifier: MIT

//! Workflow graphs
//!
//! A [`StateGraph`] is assembled from agent nodes, static edges and
//! router-driven conditional edges, then validated once by `compile`.
//! The resulting [`CompiledGraph`] runs one conversational turn per `invoke`.

mod builder;
mod executor;
mod router;

pub use builder::StateGraph;
pub use executor::CompiledGraph;
pub use router::{NextFieldRouter, Router, ToolsCondition};

/// Reserved identifier of the graph's end marker
pub const END: &str = "__end__";
