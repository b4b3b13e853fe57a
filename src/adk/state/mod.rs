// SPDX-License-Identifier: MIT

//! Shared conversation state
//!
//! This module provides:
//! - `SlotSchema` - declares a workflow's domain slots
//! - `ChatState` - per-session state with reducer support
//! - `StateUpdate` - partial update returned by nodes

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, SlotDef, SlotSchema};
pub use store::{ChatState, Control, StateUpdate};
