// SPDX-License-Identifier: MIT

//! Tools offered to the workflows
//!
//! Availability is probed once, when a workflow builds its registry.

pub mod gsheet;
pub mod time;

use crate::adk::registry::ToolRegistry;
use crate::adk::tool::Tool;
use crate::chatflow::config::SheetsConfig;
use std::sync::Arc;

/// Registry for the OKR workflow. The spreadsheet tool is included only when
/// its credential file exists at this point.
pub fn okr_tools(sheets: &SheetsConfig) -> ToolRegistry {
    let mut tools: Vec<Arc<dyn Tool>> = vec![Arc::new(time::DateTimeTool)];

    if gsheet::SheetsTool::is_available(sheets) {
        tools.push(Arc::new(gsheet::SheetsTool::new(sheets.clone())));
    } else {
        log::info!(
            "Google Sheets tool disabled: {} not found",
            sheets.credentials_path.display()
        );
    }

    ToolRegistry::new(tools)
}
