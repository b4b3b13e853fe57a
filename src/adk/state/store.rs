// SPDX-License-Identifier: MIT

//! Shared conversation state and partial state updates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::schema::{ReducerType, SlotSchema};
use crate::adk::model::Message;

/// Transient hand-off fields written by routing-capable nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Control {
    /// Identifier of the node to route to next
    pub next: Option<String>,
    /// Free-text guidance for the next node
    #[serde(default)]
    pub instruction: String,
}

/// Shared state of one conversation session.
///
/// Holds no live handles so it can be persisted between turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatState {
    /// Name of the owning workflow
    pub workflow: String,
    /// Chronological history, replayed into every prompt
    pub messages: Vec<Message>,
    pub model_selector: String,
    pub slots: BTreeMap<String, Value>,
    pub control: Control,
    #[serde(default)]
    reducers: BTreeMap<String, ReducerType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    item_keys: BTreeMap<String, Vec<String>>,
}

impl ChatState {
    /// Create a state with every declared slot set to its default
    pub fn new(
        workflow: impl Into<String>,
        model_selector: impl Into<String>,
        schema: &SlotSchema,
    ) -> Self {
        let mut slots = BTreeMap::new();
        let mut reducers = BTreeMap::new();
        let mut item_keys = BTreeMap::new();

        for (name, def) in &schema.fields {
            slots.insert(name.clone(), def.initial_value());
            reducers.insert(name.clone(), def.reducer);
            if !def.key.is_empty() {
                item_keys.insert(name.clone(), def.key.clone());
            }
        }

        Self {
            workflow: workflow.into(),
            messages: Vec::new(),
            model_selector: model_selector.into(),
            slots,
            control: Control::default(),
            reducers,
            item_keys,
        }
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.control.next = Some(next.into());
        self
    }

    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// Slot rendered as prompt text; strings are unquoted, missing slots are empty
    pub fn slot_text(&self, name: &str) -> String {
        match self.slots.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Merge a partial update. Messages are only ever appended.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);

        for (key, value) in update.slots {
            self.update_slot(&key, value);
        }

        if let Some(next) = update.next {
            self.control.next = Some(next);
        }
        if let Some(instruction) = update.instruction {
            self.control.instruction = instruction;
        }
        if let Some(model) = update.model_selector {
            self.model_selector = model;
        }
    }

    /// Update a slot using its declared reducer (undeclared slots overwrite)
    fn update_slot(&mut self, key: &str, value: Value) {
        let reducer = self.reducers.get(key).copied().unwrap_or_default();

        match reducer {
            ReducerType::Overwrite => {
                self.slots.insert(key.to_string(), value);
            }
            ReducerType::Append => {
                let arr = self
                    .slots
                    .entry(key.to_string())
                    .or_insert(Value::Array(vec![]));
                if !arr.is_array() {
                    *arr = Value::Array(vec![]);
                }
                if let Value::Array(a) = arr {
                    match value {
                        Value::Array(new_items) => a.extend(new_items),
                        other => a.push(other),
                    }
                }
            }
            ReducerType::Upsert => {
                let fields = self.item_keys.get(key).cloned().unwrap_or_default();
                let arr = self
                    .slots
                    .entry(key.to_string())
                    .or_insert(Value::Array(vec![]));
                if !arr.is_array() {
                    *arr = Value::Array(vec![]);
                }
                if let Value::Array(a) = arr {
                    let items = match value {
                        Value::Array(items) => items,
                        other => vec![other],
                    };
                    for item in items {
                        match a.iter_mut().find(|existing| same_item(&fields, existing, &item)) {
                            Some(existing) => *existing = item,
                            None => a.push(item),
                        }
                    }
                }
            }
            ReducerType::Merge => {
                let current = self
                    .slots
                    .entry(key.to_string())
                    .or_insert(Value::Object(Map::new()));
                match (current, value) {
                    (Value::Object(current_obj), Value::Object(new_obj)) => {
                        current_obj.extend(new_obj);
                    }
                    (current, other) => {
                        log::warn!("Slot '{}' merge with non-object value, overwriting", key);
                        *current = other;
                    }
                }
            }
        }
    }
}

/// Items match on every key field; without key fields, on the whole value
fn same_item(fields: &[String], a: &Value, b: &Value) -> bool {
    if fields.is_empty() {
        return a == b;
    }
    fields.iter().all(|f| a.get(f) == b.get(f))
}

/// Partial update returned by a node and merged into [`ChatState`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub slots: Vec<(String, Value)>,
    pub next: Option<String>,
    pub instruction: Option<String>,
    pub model_selector: Option<String>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn slot(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.slots.push((name.into(), value.into()));
        self
    }

    pub fn next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
