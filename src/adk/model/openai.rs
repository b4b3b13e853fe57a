// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API (and compatible endpoints)

use super::{GenerationConfig, Message, Model, Part, Role};
use crate::adk::error::{ChatError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const PROVIDER: &str = "OpenAI";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings shared by every OpenAI model instance
#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub api_key: String,
    pub base_url: String,
    /// Whole-request timeout, surfaced to nodes as an unavailable collaborator
    pub timeout: Duration,
}

/// OpenAI chat model implementation
pub struct OpenAIModel {
    client: Client,
    settings: OpenAISettings,
    model_name: String,
}

impl OpenAIModel {
    pub fn new(model_name: impl Into<String>, settings: OpenAISettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            model_name: model_name.into(),
        })
    }

    /// Convert one message into one or more OpenAI messages.
    ///
    /// Tool results become one `tool` message per result.
    fn to_openai_messages(message: &Message) -> Vec<Value> {
        if message.role == Role::Tool {
            return message
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::ToolResult { id, response, .. } => Some(json!({
                        "role": "tool",
                        "tool_call_id": id,
                        "content": serde_json::to_string(response).unwrap_or_default()
                    })),
                    _ => None,
                })
                .collect();
        }

        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant | Role::Tool => "assistant",
        };

        let text = message.text_content();
        let tool_calls: Vec<Value> = message
            .tool_calls()
            .into_iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": serde_json::to_string(&call.args).unwrap_or_default()
                    }
                })
            })
            .collect();

        if tool_calls.is_empty() {
            vec![json!({ "role": role, "content": text })]
        } else {
            vec![json!({
                "role": role,
                "content": if text.is_empty() { Value::Null } else { json!(text) },
                "tool_calls": tool_calls
            })]
        }
    }

    /// Convert tools to OpenAI function format
    fn tools_to_openai_format(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
                })
            })
            .collect()
    }

    fn build_request_body(
        &self,
        history: &[Message],
        config: &GenerationConfig,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Value {
        let messages: Vec<Value> = history.iter().flat_map(Self::to_openai_messages).collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(temp) = config.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(max_tokens) = config.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = config.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(format) = &config.response_format {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format.name,
                    "schema": format.schema,
                }
            });
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(Self::tools_to_openai_format(tools));
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse an OpenAI response into an assistant message
    fn parse_openai_response(response: &Value) -> Result<Message> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ChatError::api(PROVIDER, "No choices in response"))?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text {
                    text: content.to_string(),
                });
            }
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let id = tc["id"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                let name = tc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let args: Value = serde_json::from_str(args_str).unwrap_or_else(|e| {
                    log::warn!("Tool call '{}' has malformed arguments: {}", name, e);
                    json!({})
                });

                parts.push(Part::ToolCall { id, name, args });
            }
        }

        Ok(Message {
            role: Role::Assistant,
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        history: &[Message],
        config: &GenerationConfig,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = self.build_request_body(history, config, tools);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ChatError::api(PROVIDER, format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::ResponseFormat;

    fn model() -> OpenAIModel {
        OpenAIModel::new(
            "gpt-4o-mini",
            OpenAISettings {
                api_key: "test".into(),
                base_url: "http://localhost".into(),
                timeout: Duration::from_secs(5),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_user_message() {
        let msgs = OpenAIModel::to_openai_messages(&Message::user("Hello"));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[0]["content"], "Hello");
    }

    #[test]
    fn test_assistant_with_tool_call_keeps_id() {
        let msg = Message {
            role: Role::Assistant,
            parts: vec![Part::ToolCall {
                id: "call_42".into(),
                name: "get_datetime_now".into(),
                args: json!({}),
            }],
        };
        let msgs = OpenAIModel::to_openai_messages(&msg);
        assert_eq!(msgs[0]["role"], "assistant");
        assert!(msgs[0]["content"].is_null());
        assert_eq!(msgs[0]["tool_calls"][0]["id"], "call_42");
        assert_eq!(
            msgs[0]["tool_calls"][0]["function"]["name"],
            "get_datetime_now"
        );
    }

    #[test]
    fn test_tool_results_expand_to_one_message_each() {
        let msg = Message {
            role: Role::Tool,
            parts: vec![
                Part::ToolResult {
                    id: "a".into(),
                    name: "t".into(),
                    response: json!({"ok": 1}),
                    is_error: false,
                },
                Part::ToolResult {
                    id: "b".into(),
                    name: "t".into(),
                    response: json!({"error": "boom"}),
                    is_error: true,
                },
            ],
        };
        let msgs = OpenAIModel::to_openai_messages(&msg);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["tool_call_id"], "a");
        assert_eq!(msgs[1]["tool_call_id"], "b");
        assert_eq!(msgs[1]["role"], "tool");
    }

    #[test]
    fn test_request_body_includes_response_format() {
        let config = GenerationConfig {
            response_format: Some(ResponseFormat {
                name: "SupervisorResponse".into(),
                schema: json!({"type": "object"}),
            }),
            ..Default::default()
        };
        let body = model().build_request_body(&[Message::user("hi")], &config, None);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            "SupervisorResponse"
        );
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let response = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Xin chào!" }
            }]
        });
        let msg = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text_content(), "Xin chào!");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "list_spreadsheets",
                            "arguments": "{\"folder\": \"abc\"}"
                        }
                    }]
                }
            }]
        });
        let msg = OpenAIModel::parse_openai_response(&response).unwrap();
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_123");
        assert_eq!(calls[0].args["folder"], "abc");
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let err = OpenAIModel::parse_openai_response(&json!({})).unwrap_err();
        assert!(matches!(err, ChatError::Api { .. }));
    }
}
