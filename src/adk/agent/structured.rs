// SPDX-License-Identifier: MIT

//! Structured Agent - extracts a typed record from the model
//!
//! The record type declares the output shape: its JSON schema is sent to the
//! model, and the reply is decoded back into the type. Anything that does not
//! decode (bad JSON, missing field, value outside an enum) is an extraction
//! failure rather than a silently coerced value.

use super::prompt::render_template;
use super::{resolve_model, AgentNode, RunConfig};
use crate::adk::error::WorkflowError;
use crate::adk::model::{GenerationConfig, Message, ModelProvider, ResponseFormat};
use crate::adk::state::{ChatState, StateUpdate};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// A structured output shape and how it maps into the shared state
pub trait StructuredResponse: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    fn into_update(self) -> StateUpdate;
}

/// Decode a model reply into `R`.
///
/// Accepts a bare JSON object or one wrapped in a Markdown code fence.
pub fn decode_structured<R: DeserializeOwned>(node: &str, reply: &Message) -> Result<R, WorkflowError> {
    let text = reply.text_content();
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(WorkflowError::extraction(node, "model returned no structured content"));
    }
    serde_json::from_str(body).map_err(|e| WorkflowError::extraction(node, e))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub struct StructuredAgent<R> {
    name: String,
    template: String,
    provider: Arc<dyn ModelProvider>,
    generation: GenerationConfig,
    /// Corrective follow-ups after a failed decode before giving up
    retries: usize,
    _shape: PhantomData<fn() -> R>,
}

impl<R: StructuredResponse> StructuredAgent<R> {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        let schema = schemars::schema_for!(R);
        let generation = GenerationConfig {
            response_format: Some(ResponseFormat {
                name: R::schema_name(),
                schema: serde_json::to_value(&schema).unwrap_or_default(),
            }),
            ..Default::default()
        };

        Self {
            name: name.into(),
            template: template.into(),
            provider,
            generation,
            retries: 0,
            _shape: PhantomData,
        }
    }

    /// Retry a failed decode up to `retries` times with a corrective instruction
    pub fn with_extraction_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }
}

#[async_trait]
impl<R: StructuredResponse> AgentNode for StructuredAgent<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &ChatState, config: &RunConfig) -> Result<StateUpdate, WorkflowError> {
        let model = resolve_model(&self.name, self.provider.as_ref(), state, config)?;

        let mut history = Vec::with_capacity(state.messages.len() + 1);
        history.push(Message::system(render_template(&self.template, state)));
        history.extend(state.messages.iter().cloned());

        let mut attempt = 0;
        loop {
            let reply = model
                .generate(&history, &self.generation, None)
                .await
                .map_err(|e| WorkflowError::collaborator(&self.name, e))?;

            match decode_structured::<R>(&self.name, &reply) {
                Ok(record) => {
                    let update = record.into_update();
                    log::info!(
                        "Agent {} extracted {} (next: {:?})",
                        self.name,
                        R::schema_name(),
                        update.next
                    );
                    return Ok(update);
                }
                Err(WorkflowError::Extraction { reason, .. }) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Agent {} output did not match {} ({}), retry {}/{}",
                        self.name,
                        R::schema_name(),
                        reason,
                        attempt,
                        self.retries
                    );
                    history.push(reply);
                    history.push(Message::user(format!(
                        "Your previous answer was invalid: {}. Answer again with a JSON object matching the {} schema exactly.",
                        reason,
                        R::schema_name()
                    )));
                }
                Err(e) => {
                    log::error!("Agent {} extraction failed: {}", self.name, e);
                    return Err(e);
                }
            }
        }
    }
}
