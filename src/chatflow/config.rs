// SPDX-License-Identifier: MIT

//! Application configuration gathered from environment variables
//!
//! `main` loads `.env` with dotenv before calling [`AppConfig::from_env`].

use crate::adk::agent::DEFAULT_MAX_STEPS;
use crate::adk::error::{ChatError, Result};
use crate::adk::model::openai::{OpenAISettings, DEFAULT_BASE_URL};
use std::path::PathBuf;
use std::time::Duration;

/// Google Sheets tool settings
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// OAuth client file; its presence enables the spreadsheet tool
    pub credentials_path: PathBuf,
    /// Authorized-user token file holding the refresh token
    pub token_path: PathBuf,
    /// Cell range read from every tab
    pub range: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            range: "A1:F100".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when no API key is configured; models can be listed but not called
    pub openai: Option<OpenAISettings>,
    /// Extra model names added to the catalog
    pub extra_models: Vec<String>,
    pub max_steps: usize,
    pub llm_timeout: Duration,
    pub tool_timeout: Duration,
    pub sheets: SheetsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai: None,
            extra_models: Vec::new(),
            max_steps: DEFAULT_MAX_STEPS,
            llm_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            sheets: SheetsConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process env in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let llm_timeout = match lookup("CHATFLOW_LLM_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("CHATFLOW_LLM_TIMEOUT_SECS", &v)?),
            None => defaults.llm_timeout,
        };
        let tool_timeout = match lookup("CHATFLOW_TOOL_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("CHATFLOW_TOOL_TIMEOUT_SECS", &v)?),
            None => defaults.tool_timeout,
        };
        let max_steps = match lookup("CHATFLOW_MAX_STEPS") {
            Some(v) => parse_number("CHATFLOW_MAX_STEPS", &v)? as usize,
            None => defaults.max_steps,
        };
        if max_steps == 0 {
            return Err(ChatError::config("CHATFLOW_MAX_STEPS must be at least 1"));
        }

        let openai = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| OpenAISettings {
                api_key,
                base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: llm_timeout,
            });
        if openai.is_none() {
            log::warn!("OPENAI_API_KEY is not set; chat turns will fail until it is configured");
        }

        let extra_models = lookup("CHATFLOW_MODELS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let sheets = SheetsConfig {
            credentials_path: lookup("GSHEET_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(defaults.sheets.credentials_path),
            token_path: lookup("GSHEET_TOKEN")
                .map(PathBuf::from)
                .unwrap_or(defaults.sheets.token_path),
            range: lookup("GSHEET_RANGE").unwrap_or(defaults.sheets.range),
        };

        Ok(Self {
            openai,
            extra_models,
            max_steps,
            llm_timeout,
            tool_timeout,
            sheets,
        })
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ChatError::config(format!("{} must be a number, got '{}'", key, value)))
}
