// SPDX-License-Identifier: MIT

use crate::adk::error::Result;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

static DATETIME_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {}
    })
});

/// Current local date and time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "get_datetime_now"
    }

    fn description(&self) -> &str {
        "Get the current local date and time in ISO 8601 format, with the weekday."
    }

    fn schema(&self) -> &Value {
        &DATETIME_SCHEMA
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let now = Local::now();
        Ok(json!({
            "datetime": now.to_rfc3339(),
            "weekday": now.format("%A").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_returns_parseable_datetime() {
        let out = DateTimeTool.execute(json!({})).await.unwrap();
        let raw = out["datetime"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(raw).is_ok());
        assert!(!out["weekday"].as_str().unwrap().is_empty());
    }
}
