// SPDX-License-Identifier: MIT

//! Agent development kit - the workflow runtime
//!
//! Models, tools, shared state, agent nodes and the graph that wires them.

pub mod agent;
pub mod error;
pub mod graph;
pub mod model;
pub mod registry;
pub mod state;
pub mod tool;
