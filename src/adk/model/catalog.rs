// SPDX-License-Identifier: MIT

//! Model catalog - known models, their capabilities, and model resolution

use super::openai::{OpenAIModel, OpenAISettings};
use super::Model;
use crate::adk::error::{ChatError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// What a model can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelCapability {
    TextToText,
    ToolCalling,
    StructuredOutput,
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub capabilities: BTreeSet<ModelCapability>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, capabilities: &[ModelCapability]) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.iter().copied().collect(),
        }
    }
}

/// Resolves a model selector into a live model handle
pub trait ModelProvider: Send + Sync {
    fn model(&self, name: &str) -> Result<Arc<dyn Model>>;
}

const CHAT_CAPABILITIES: &[ModelCapability] = &[
    ModelCapability::TextToText,
    ModelCapability::ToolCalling,
    ModelCapability::StructuredOutput,
];

/// Catalog of OpenAI-compatible models
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
    settings: Option<OpenAISettings>,
    /// Instances are built lazily and reused across sessions
    instances: Mutex<HashMap<String, Arc<dyn Model>>>,
}

impl ModelCatalog {
    /// Catalog with the default models plus `extra` model names.
    ///
    /// Without settings the catalog can still list models (for settings
    /// forms) but `model()` fails with a configuration error.
    pub fn new(settings: Option<OpenAISettings>, extra: &[String]) -> Self {
        let mut models: Vec<ModelInfo> = ["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-4.1"]
            .into_iter()
            .map(|name| ModelInfo::new(name, CHAT_CAPABILITIES))
            .collect();
        for name in extra {
            if !models.iter().any(|m| &m.name == name) {
                models.push(ModelInfo::new(name.clone(), CHAT_CAPABILITIES));
            }
        }
        Self {
            models,
            settings,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Sorted names of models that have every requested capability
    pub fn list_models(&self, capabilities: &[ModelCapability]) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .iter()
            .filter(|m| capabilities.iter().all(|c| m.capabilities.contains(c)))
            .map(|m| m.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Add a model, replacing any entry with the same name
    pub fn register(&mut self, info: ModelInfo) {
        self.models.retain(|m| m.name != info.name);
        self.models.push(info);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }
}

impl ModelProvider for ModelCatalog {
    fn model(&self, name: &str) -> Result<Arc<dyn Model>> {
        if !self.contains(name) {
            return Err(ChatError::config(format!("Unknown model: {}", name)));
        }
        let settings = self
            .settings
            .clone()
            .ok_or_else(|| ChatError::config("OPENAI_API_KEY must be set"))?;

        let mut instances = self
            .instances
            .lock()
            .map_err(|_| ChatError::other("model cache poisoned"))?;
        if let Some(model) = instances.get(name) {
            return Ok(model.clone());
        }
        log::info!("Creating model '{}'", name);
        let model: Arc<dyn Model> = Arc::new(OpenAIModel::new(name, settings)?);
        instances.insert(name.to_string(), model.clone());
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> OpenAISettings {
        OpenAISettings {
            api_key: "test".into(),
            base_url: "http://localhost".into(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_list_models_is_sorted_and_filtered() {
        let mut catalog = ModelCatalog::new(None, &[]);
        catalog.register(ModelInfo::new("text-only", &[ModelCapability::TextToText]));

        let all = catalog.list_models(&[ModelCapability::TextToText]);
        assert!(all.contains(&"text-only".to_string()));
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);

        let tools = catalog.list_models(&[
            ModelCapability::TextToText,
            ModelCapability::ToolCalling,
        ]);
        assert!(!tools.contains(&"text-only".to_string()));
        assert!(tools.contains(&"gpt-4o-mini".to_string()));
    }

    #[test]
    fn test_extra_models_are_added_once() {
        let catalog = ModelCatalog::new(None, &["llama3".into(), "gpt-4o".into()]);
        let names = catalog.list_models(&[]);
        assert_eq!(names.iter().filter(|n| *n == "gpt-4o").count(), 1);
        assert!(catalog.contains("llama3"));
    }

    #[test]
    fn test_model_requires_settings() {
        let catalog = ModelCatalog::new(None, &[]);
        assert!(matches!(
            catalog.model("gpt-4o-mini"),
            Err(ChatError::Config(_))
        ));
    }

    #[test]
    fn test_model_instances_are_cached() {
        let catalog = ModelCatalog::new(Some(settings()), &[]);
        let a = catalog.model("gpt-4o-mini").unwrap();
        let b = catalog.model("gpt-4o-mini").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "gpt-4o-mini");
        assert!(catalog.model("unknown-model").is_err());
    }
}
