// SPDX-License-Identifier: MIT

//! Immutable tool registry
//!
//! A registry is assembled once when a workflow is constructed (after any
//! capability probing) and never changes afterwards.

use crate::adk::tool::Tool;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    /// Index into `tools` by name
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry. A later tool with a duplicate name replaces an earlier one.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::default();
        for tool in tools {
            let name = tool.name().to_string();
            match registry.by_name.get(&name) {
                Some(&i) => {
                    log::warn!("Tool '{}' registered twice, keeping the last one", name);
                    registry.tools[i] = tool;
                }
                None => {
                    registry.by_name.insert(name, registry.tools.len());
                    registry.tools.push(tool);
                }
            }
        }
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    /// Tools in registration order
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::Result;
    use async_trait::async_trait;
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};

    static MOCK_SCHEMA: Lazy<Value> = Lazy::new(|| {
        json!({
            "type": "object",
            "properties": {}
        })
    });

    struct MockTool {
        name: String,
        reply: &'static str,
    }

    impl MockTool {
        fn new(name: &str, reply: &'static str) -> Self {
            Self {
                name: name.to_string(),
                reply,
            }
        }
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Mock tool"
        }

        fn schema(&self) -> &Value {
            &MOCK_SCHEMA
        }

        async fn execute(&self, _args: Value) -> Result<Value> {
            Ok(json!({ "result": self.reply }))
        }
    }

    #[test]
    fn test_get_registered_tool() {
        let registry = ToolRegistry::new([Arc::new(MockTool::new("a", "x")) as Arc<dyn Tool>]);
        assert_eq!(registry.get("a").map(|t| t.name()), Some("a"));
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.get("list_spreadsheets").is_none());
    }

    #[test]
    fn test_preserves_registration_order() {
        let registry = ToolRegistry::new([
            Arc::new(MockTool::new("first", "1")) as Arc<dyn Tool>,
            Arc::new(MockTool::new("second", "2")),
        ]);
        assert_eq!(registry.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_last() {
        let registry = ToolRegistry::new([
            Arc::new(MockTool::new("same", "old")) as Arc<dyn Tool>,
            Arc::new(MockTool::new("same", "new")),
        ]);
        assert_eq!(registry.len(), 1);
        let out = registry.get("same").unwrap().execute(json!({})).await.unwrap();
        assert_eq!(out["result"], "new");
    }
}
