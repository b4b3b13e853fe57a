// SPDX-License-Identifier: MIT

//! Prompt templates with `{slot}` placeholders

use crate::adk::state::ChatState;

/// Interpolate `{name}` placeholders from the state's slots and `{instruction}`
/// from the control field. Unknown placeholders are left as written.
pub fn render_template(template: &str, state: &ChatState) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder(&after[..end]) => {
                let key = &after[..end];
                match lookup(key, state) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn lookup(key: &str, state: &ChatState) -> Option<String> {
    match key {
        "instruction" => Some(state.control.instruction.clone()),
        _ if state.slots.contains_key(key) => Some(state.slot_text(key)),
        _ => None,
    }
}
