// SPDX-License-Identifier: MIT

//! Slot schema definitions

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Schema declaring the domain slots of one workflow's state
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct SlotSchema {
    #[serde(flatten)]
    pub fields: BTreeMap<String, SlotDef>,
}

impl SlotSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a slot whose default is the empty value of its type
    pub fn slot(self, name: &str, field_type: FieldType, reducer: ReducerType) -> Self {
        self.slot_with_default(name, field_type, reducer, None)
    }

    pub fn slot_with_default(
        mut self,
        name: &str,
        field_type: FieldType,
        reducer: ReducerType,
        default: Option<Value>,
    ) -> Self {
        self.fields.insert(
            name.to_string(),
            SlotDef {
                field_type,
                reducer,
                default,
                key: Vec::new(),
            },
        );
        self
    }

    /// Declare an array slot whose items are replaced, not duplicated, when
    /// an update carries an item with the same `key` fields
    pub fn keyed_slot(mut self, name: &str, key: &[&str]) -> Self {
        self.fields.insert(
            name.to_string(),
            SlotDef {
                field_type: FieldType::Array,
                reducer: ReducerType::Upsert,
                default: None,
                key: key.iter().map(|k| k.to_string()).collect(),
            },
        );
        self
    }
}

/// Definition of a single slot
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SlotDef {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub reducer: ReducerType,
    pub default: Option<Value>,
    /// Item fields identifying an element of an `upsert` slot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

impl SlotDef {
    /// Initial value: the declared default, or the empty value of the type
    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.empty_value())
    }
}

/// Supported slot types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn empty_value(&self) -> Value {
        match self {
            FieldType::String => json!(""),
            FieldType::Number => json!(0),
            FieldType::Boolean => json!(false),
            FieldType::Array => json!([]),
            FieldType::Object => json!({}),
        }
    }
}

/// How an update is merged into a slot
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Shallow-merge objects
    Merge,
    /// Append to array, replacing items with the same key
    Upsert,
}
