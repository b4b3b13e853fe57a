// SPDX-License-Identifier: MIT

//! Conversational workflows
//!
//! A workflow bundles its front-end metadata (chat profile and settings),
//! the initial shared state of a session, and the graph that runs each turn.

mod catalog;
pub mod hospital;
pub mod okr;
mod session;

pub use catalog::{WorkflowCatalog, WorkflowEntry};
pub use hospital::HospitalBooking;
pub use okr::OkrChat;
pub use session::Session;

use crate::adk::error::GraphError;
use crate::adk::graph::CompiledGraph;
use crate::adk::model::{ModelCapability, ModelCatalog};
use crate::adk::state::ChatState;
use serde::Serialize;

/// Suggested opening message shown by the front end
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Starter {
    pub label: String,
    pub message: String,
    pub icon: Option<String>,
}

impl Starter {
    pub fn new(message: &str, icon: &str) -> Self {
        Self {
            label: message.to_string(),
            message: message.to_string(),
            icon: Some(icon.to_string()),
        }
    }
}

/// Front-end metadata of a workflow
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatProfile {
    pub name: String,
    pub markdown_description: String,
    pub icon: String,
    /// Selected when the user has not picked a profile
    pub default: bool,
    pub starters: Vec<Starter>,
}

/// A select widget whose value is written into the session state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Select {
    pub id: String,
    pub label: String,
    pub values: Vec<String>,
    pub initial_index: usize,
}

impl Select {
    pub fn initial_value(&self) -> Option<&str> {
        self.values.get(self.initial_index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatSettings {
    pub inputs: Vec<Select>,
}

impl ChatSettings {
    /// The usual single model selector, sorted, starting at `initial`.
    ///
    /// `InitialModel::Last` picks the last entry of the sorted list.
    pub fn model_select(models: Vec<String>, initial: InitialModel) -> Self {
        let initial_index = match initial {
            InitialModel::First => 0,
            InitialModel::Last => models.len().saturating_sub(1),
        };
        Self {
            inputs: vec![Select {
                id: MODEL_SETTING.to_string(),
                label: "Chat Model".to_string(),
                values: models,
                initial_index,
            }],
        }
    }

    pub fn select(&self, id: &str) -> Option<&Select> {
        self.inputs.iter().find(|s| s.id == id)
    }
}

/// Settings id of the model selector
pub const MODEL_SETTING: &str = "chat_model";

#[derive(Debug, Clone, Copy)]
pub enum InitialModel {
    First,
    Last,
}

/// A conversational workflow type. One instance serves every session of that type.
pub trait Workflow: Send + Sync {
    fn name(&self) -> &str;

    fn profile(&self) -> ChatProfile;

    /// Capabilities a model needs to drive this workflow
    fn capabilities(&self) -> &[ModelCapability];

    fn settings(&self, models: &ModelCatalog) -> ChatSettings;

    /// Fresh state for a new session
    fn default_state(&self) -> ChatState;

    fn build_graph(&self) -> Result<CompiledGraph, GraphError>;
}
