// SPDX-License-Identifier: MIT

//! Workflow catalog - every workflow type with its compiled graph

use super::{
    hospital, ChatProfile, ChatSettings, HospitalBooking, OkrChat, Session, Workflow, MODEL_SETTING,
};
use crate::adk::error::{ChatError, Result};
use crate::adk::graph::CompiledGraph;
use crate::adk::model::{ModelCatalog, ModelProvider};
use crate::chatflow::config::AppConfig;
use crate::chatflow::tools;
use std::sync::Arc;

/// A workflow and the graph shared by all of its sessions
pub struct WorkflowEntry {
    pub workflow: Arc<dyn Workflow>,
    pub graph: Arc<CompiledGraph>,
}

pub struct WorkflowCatalog {
    models: Arc<ModelCatalog>,
    entries: Vec<WorkflowEntry>,
    max_steps: usize,
}

impl WorkflowCatalog {
    /// Catalog backed by the configured OpenAI-compatible models
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let models = Arc::new(ModelCatalog::new(config.openai.clone(), &config.extra_models));
        Self::with_provider(config, models.clone(), models)
    }

    /// Catalog whose nodes resolve models through `provider`; `models` only
    /// supplies the names offered in settings.
    pub fn with_provider(
        config: &AppConfig,
        models: Arc<ModelCatalog>,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self> {
        let okr_model = models
            .list_models(&[])
            .into_iter()
            .next()
            .unwrap_or_else(|| hospital::DEFAULT_MODEL.to_string());

        let workflows: Vec<Arc<dyn Workflow>> = vec![
            Arc::new(HospitalBooking::new(provider.clone())),
            Arc::new(
                OkrChat::new(provider, tools::okr_tools(&config.sheets), okr_model)
                    .with_tool_timeout(config.tool_timeout),
            ),
        ];

        let mut catalog = Self {
            models,
            entries: Vec::with_capacity(workflows.len()),
            max_steps: config.max_steps,
        };
        for workflow in workflows {
            catalog.register(workflow)?;
        }
        Ok(catalog)
    }

    /// Add a workflow; its graph is compiled once here
    pub fn register(&mut self, workflow: Arc<dyn Workflow>) -> Result<()> {
        if self.entries.iter().any(|e| e.workflow.name() == workflow.name()) {
            return Err(ChatError::config(format!(
                "Workflow '{}' registered twice",
                workflow.name()
            )));
        }
        let graph = Arc::new(workflow.build_graph()?);
        log::info!(
            "Registered workflow '{}' ({} nodes)",
            workflow.name(),
            graph.node_ids().len()
        );
        self.entries.push(WorkflowEntry { workflow, graph });
        Ok(())
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn entries(&self) -> &[WorkflowEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Result<&WorkflowEntry> {
        self.entries
            .iter()
            .find(|e| e.workflow.name() == name)
            .ok_or_else(|| ChatError::UnknownWorkflow(name.to_string()))
    }

    /// The workflow marked as default, or the first one
    pub fn default_workflow(&self) -> Option<&WorkflowEntry> {
        self.entries
            .iter()
            .find(|e| e.workflow.profile().default)
            .or_else(|| self.entries.first())
    }

    pub fn profiles(&self) -> Vec<(ChatProfile, ChatSettings)> {
        self.entries
            .iter()
            .map(|e| (e.workflow.profile(), e.workflow.settings(&self.models)))
            .collect()
    }

    /// Fail unless `model` is offered by the workflow's model setting
    pub fn check_model(&self, name: &str, model: &str) -> Result<()> {
        let entry = self.get(name)?;
        let offered = entry
            .workflow
            .settings(&self.models)
            .select(MODEL_SETTING)
            .is_some_and(|s| s.values.iter().any(|v| v == model));
        if !offered {
            return Err(ChatError::config(format!(
                "Model '{}' is not available for workflow '{}'",
                model, name
            )));
        }
        Ok(())
    }

    /// Start a session; `model` overrides the workflow's default selector
    pub fn start_session(&self, name: &str, model: Option<&str>) -> Result<Session> {
        let entry = self.get(name)?;
        let mut state = entry.workflow.default_state();

        if let Some(model) = model {
            self.check_model(name, model)?;
            state.model_selector = model.to_string();
        }

        Ok(Session::new(entry.graph.clone(), state, self.max_steps))
    }
}
