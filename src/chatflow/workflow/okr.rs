// SPDX-License-Identifier: MIT

//! OKR Chat - a tool-using assistant over the company's OKR spreadsheets
//!
//! ```text
//! chat --tool calls--> tools -> chat
//!      \-------------> END
//! ```

use super::{ChatProfile, ChatSettings, InitialModel, Starter, Workflow};
use crate::adk::agent::{ChatAgent, ToolNode};
use crate::adk::error::GraphError;
use crate::adk::graph::{CompiledGraph, StateGraph, ToolsCondition};
use crate::adk::model::{ModelCapability, ModelCatalog, ModelProvider};
use crate::adk::registry::ToolRegistry;
use crate::adk::state::{ChatState, SlotSchema};
use std::sync::Arc;
use std::time::Duration;

pub const NAME: &str = "OKR Chat";

const CHAT: &str = "chat";
const TOOLS: &str = "tools";

const CAPABILITIES: &[ModelCapability] = &[ModelCapability::TextToText, ModelCapability::ToolCalling];

const CHAT_PROMPT: &str =
    "You are an OKR Chat Assistant. Help users query and understand OKR data for the company.";

pub struct OkrChat {
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    tool_timeout: Duration,
    default_model: String,
}

impl OkrChat {
    /// `tools` is fixed for the lifetime of the workflow
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: ToolRegistry,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            tool_timeout: Duration::from_secs(30),
            default_model: default_model.into(),
        }
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

impl Workflow for OkrChat {
    fn name(&self) -> &str {
        NAME
    }

    fn profile(&self) -> ChatProfile {
        ChatProfile {
            name: NAME.to_string(),
            markdown_description:
                "An AI-powered assistant for querying and understanding OKR data.".to_string(),
            icon: "https://cdn1.iconfinder.com/data/icons/3d-front-color/128/chat-text-front-color.png"
                .to_string(),
            default: true,
            starters: vec![
                Starter::new(
                    "What are the company’s Q1 objectives?",
                    "https://cdn1.iconfinder.com/data/icons/3d-dynamic-color/128/target-dynamic-color.png",
                ),
                Starter::new(
                    "Show me the key results for the Sales department.",
                    "https://cdn1.iconfinder.com/data/icons/3d-dynamic-color/128/chart-dynamic-color.png",
                ),
                Starter::new(
                    "Summarize our overall OKR progress for the year.",
                    "https://cdn1.iconfinder.com/data/icons/3d-dynamic-color/128/calendar-dynamic-color.png",
                ),
            ],
        }
    }

    fn capabilities(&self) -> &[ModelCapability] {
        CAPABILITIES
    }

    fn settings(&self, models: &ModelCatalog) -> ChatSettings {
        ChatSettings::model_select(models.list_models(CAPABILITIES), InitialModel::First)
    }

    fn default_state(&self) -> ChatState {
        // One record per spreadsheet tab; a refetch replaces the tab's record
        let schema = SlotSchema::new().keyed_slot("okr_data", &["sheet_name", "sheet_title"]);
        ChatState::new(NAME, self.default_model.as_str(), &schema)
    }

    fn build_graph(&self) -> Result<CompiledGraph, GraphError> {
        let chat = ChatAgent::new(CHAT, CHAT_PROMPT, self.provider.clone())
            .with_tools(self.tools.clone());
        let tools = ToolNode::new(TOOLS, self.tools.clone())
            .with_timeout(self.tool_timeout)
            .with_result_slot("list_spreadsheets", "okr_data");

        let mut graph = StateGraph::new(NAME);
        graph
            .add_node(CHAT, Arc::new(chat))
            .add_node(TOOLS, Arc::new(tools))
            .set_entry_point(CHAT)
            .add_conditional_edges(CHAT, Arc::new(ToolsCondition::new(TOOLS)))
            .add_edge(TOOLS, CHAT);
        graph.compile()
    }
}
