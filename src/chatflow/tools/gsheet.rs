// SPDX-License-Identifier: MIT

//! Google Sheets tool - reads every spreadsheet in a Drive folder

use crate::adk::error::{ChatError, Result};
use crate::adk::tool::Tool;
use crate::chatflow::config::SheetsConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const PROVIDER: &str = "Google";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

// --- Static schema ---

static LIST_SPREADSHEETS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "folder": {
                "type": "string",
                "description": "Link to the Google Drive folder containing the OKR sheets, or its id"
            }
        },
        "required": ["folder"]
    })
});

#[derive(Debug, Deserialize)]
pub struct ListSpreadsheetsArgs {
    pub folder: String,
}

/// One non-empty tab of a spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetRecord {
    pub sheet_name: String,
    pub sheet_title: String,
    /// Row-major cell grid
    pub data: Vec<Vec<Value>>,
}

/// Authorized-user token file as written by Google's OAuth client libraries
#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Extract the folder id from a Drive folder link (last path segment) or a bare id.
///
/// Drive ids only use `[A-Za-z0-9_-]`; anything else is rejected since the id
/// is spliced into a Drive query.
pub fn folder_id(folder: &str) -> Option<&str> {
    let trimmed = folder.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .filter(|id| {
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct SheetsTool {
    client: Client,
    config: SheetsConfig,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsTool {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    /// The tool is offered only when the OAuth client file exists
    pub fn is_available(config: &SheetsConfig) -> bool {
        config.credentials_path.exists()
    }

    /// Current access token, refreshed from the stored refresh token when stale
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let raw = tokio::fs::read_to_string(&self.config.token_path)
            .await
            .map_err(|e| {
                ChatError::config(format!(
                    "Google token file {} is not readable ({}); authorize the app first",
                    self.config.token_path.display(),
                    e
                ))
            })?;
        let user: AuthorizedUser = serde_json::from_str(&raw)?;

        log::debug!("Refreshing Google access token");
        let resp = self
            .client
            .post(user.token_uri.as_deref().unwrap_or(TOKEN_URI))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(ChatError::api(PROVIDER, format!("token refresh failed: {}", text)));
        }
        let token: TokenResponse = resp.json().await?;

        // Refresh a minute early
        let lifetime = token.expires_in.unwrap_or(3600).saturating_sub(60);
        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(token.access_token)
    }

    async fn get_json(&self, url: Url, token: &str) -> Result<Value> {
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ChatError::api(PROVIDER, format!("{}: {}", status, text)));
        }
        Ok(resp.json().await?)
    }

    async fn list_folder(&self, folder_id: &str, token: &str) -> Result<Vec<DriveFile>> {
        let query = format!("'{}' in parents and mimeType='{}'", folder_id, SPREADSHEET_MIME);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = Url::parse(DRIVE_FILES_URL).map_err(|e| ChatError::other(e.to_string()))?;
            url.query_pairs_mut()
                .append_pair("q", &query)
                .append_pair("fields", "nextPageToken, files(id, name)");
            if let Some(page) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", page);
            }

            let page: DriveFileList = serde_json::from_value(self.get_json(url, token).await?)?;
            files.extend(page.files);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(files)
    }

    async fn read_spreadsheet(&self, file: &DriveFile, token: &str) -> Result<Vec<SheetRecord>> {
        let mut url = sheets_url(&[&file.id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let meta = self.get_json(url, token).await?;

        let titles: Vec<String> = meta["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut records = Vec::new();
        for title in titles {
            let range = format!("'{}'!{}", title.replace('\'', "''"), self.config.range);
            let url = sheets_url(&[&file.id, "values", &range])?;
            let values = self.get_json(url, token).await?;

            let data: Vec<Vec<Value>> = serde_json::from_value(
                values.get("values").cloned().unwrap_or_else(|| json!([])),
            )?;
            if data.is_empty() {
                continue;
            }
            records.push(SheetRecord {
                sheet_name: file.name.clone(),
                sheet_title: title,
                data,
            });
        }
        Ok(records)
    }
}

fn sheets_url(segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(SHEETS_URL).map_err(|e| ChatError::other(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ChatError::other("invalid Sheets API base URL"))?
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl Tool for SheetsTool {
    fn name(&self) -> &str {
        "list_spreadsheets"
    }

    fn description(&self) -> &str {
        "Retrieve all OKR data from the Google Sheets in a Drive folder. Returns one record per non-empty tab with the spreadsheet name, tab title and a row-major cell grid."
    }

    fn schema(&self) -> &Value {
        &LIST_SPREADSHEETS_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: ListSpreadsheetsArgs = serde_json::from_value(input)?;
        let folder = folder_id(&args.folder)
            .ok_or_else(|| ChatError::other(format!("Not a Drive folder: '{}'", args.folder)))?;

        let token = self.access_token().await?;
        let files = self.list_folder(folder, &token).await?;
        log::info!("Found {} spreadsheets in folder {}", files.len(), folder);

        let mut records = Vec::new();
        for file in &files {
            records.extend(self.read_spreadsheet(file, &token).await?);
        }
        Ok(serde_json::to_value(records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_folder_id_from_link_or_id() {
        assert_eq!(
            folder_id("https://drive.google.com/drive/folders/1AbC_dEf-9"),
            Some("1AbC_dEf-9")
        );
        assert_eq!(
            folder_id("https://drive.google.com/drive/folders/1AbC?usp=sharing"),
            Some("1AbC")
        );
        assert_eq!(folder_id("https://drive.google.com/drive/folders/1AbC/"), Some("1AbC"));
        assert_eq!(folder_id("  1AbC  "), Some("1AbC"));
        assert_eq!(folder_id(""), None);
    }

    #[test]
    fn test_folder_id_rejects_query_characters() {
        assert_eq!(folder_id("x' in parents or 'y"), None);
        assert_eq!(folder_id("abc'def"), None);
        assert_eq!(
            folder_id("https://drive.google.com/drive/folders/ab%27cd"),
            None
        );
        assert_eq!(folder_id("folder id"), None);
    }

    #[test]
    fn test_sheets_url_encodes_range() {
        let url = sheets_url(&["abc", "values", "'Q1 Sales'!A1:F100"]).unwrap();
        assert!(url.as_str().starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/"));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_availability_follows_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SheetsConfig {
            credentials_path: dir.path().join("credentials.json"),
            ..Default::default()
        };
        assert!(!SheetsTool::is_available(&config));

        let mut file = std::fs::File::create(&config.credentials_path).unwrap();
        writeln!(file, "{{}}").unwrap();
        assert!(SheetsTool::is_available(&config));
    }

    #[tokio::test]
    async fn test_missing_token_file_is_a_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SheetsTool::new(SheetsConfig {
            credentials_path: dir.path().join("credentials.json"),
            token_path: dir.path().join("token.json"),
            range: "A1:F100".into(),
        });

        let err = tool.execute(json!({"folder": "1AbC"})).await.unwrap_err();
        assert!(matches!(err, ChatError::Config(ref msg) if msg.contains("token.json")));
    }

    #[tokio::test]
    async fn test_rejects_missing_folder_argument() {
        let tool = SheetsTool::new(SheetsConfig::default());
        assert!(matches!(
            tool.execute(json!({})).await.unwrap_err(),
            ChatError::Json(_)
        ));
    }

    #[tokio::test]
    async fn test_rejects_folder_that_would_alter_the_query() {
        let tool = SheetsTool::new(SheetsConfig::default());
        let err = tool
            .execute(json!({"folder": "x' in parents or 'y"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Other(ref msg) if msg.contains("Not a Drive folder")));
    }

    #[test]
    fn test_sheet_record_shape() {
        let record = SheetRecord {
            sheet_name: "OKR 2024".into(),
            sheet_title: "Sales".into(),
            data: vec![vec![json!("Objective"), json!("Owner")]],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sheet_name"], "OKR 2024");
        assert_eq!(value["data"][0][1], "Owner");
    }
}
