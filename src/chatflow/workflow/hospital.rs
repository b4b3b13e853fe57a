// SPDX-License-Identifier: MIT

//! Hospital Booking Assistant
//!
//! A supervisor routes between three workers until the chief complaint,
//! hospital and visit date are known, then the responder confirms the booking.
//!
//! ```text
//! supervisor --next--> hospital_finder -> date_picker -> responder -> END
//!            \-------> date_picker
//!             \------> responder
//! ```

use super::{ChatProfile, ChatSettings, InitialModel, Workflow};
use crate::adk::agent::{ChatAgent, StructuredAgent, StructuredResponse};
use crate::adk::error::GraphError;
use crate::adk::graph::{CompiledGraph, NextFieldRouter, StateGraph, END};
use crate::adk::model::{ModelCapability, ModelCatalog, ModelProvider};
use crate::adk::state::{ChatState, FieldType, ReducerType, SlotSchema, StateUpdate};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

pub const NAME: &str = "Hospital Booking Assistant";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SUPERVISOR: &str = "supervisor";
const HOSPITAL_FINDER: &str = "hospital_finder";
const DATE_PICKER: &str = "date_picker";
const RESPONDER: &str = "responder";

const CAPABILITIES: &[ModelCapability] = &[
    ModelCapability::TextToText,
    ModelCapability::ToolCalling,
    ModelCapability::StructuredOutput,
];

const SUPERVISOR_PROMPT: &str = r#"You are a supervisor coordinating AI agents (`hospital_finder`, `date_picker`, `responder`) to help the user book a hospital visit.

Current progress:
- chief_complaint: {chief_complaint}
- date: {date}
- hospital: {hospital}

Instructions:
- Determine the next agent to route to, and give it an instruction to complete the task:
  1. `hospital_finder` if the chief complaint or hospital is not specified clearly.
  2. `date_picker` if the hospital is known but the date is not clear.
  3. `responder` if all information is complete and ready to finalize the booking."#;

const HOSPITAL_FINDER_PROMPT: &str = r#"You are a hospital finder assistant, coordinating with the other agents helping the user book a hospital visit.
Your responsibility is to determine the user's chief complaint and suggest the appropriate hospital.

Available hospitals for booking:
- BV Chợ Rẫy: General health and emergency services.
- BV ĐH Y Dược: Specialized in internal medicine and diagnostics.
- BV Ung Bướu: Focused on cancer treatment.

Instructions:
- Update the chief complaint and hospital based on the user's input.
- Ask the user questions about their health condition so the chief complaint is meaningful.
- Your next agents are: `date_picker` to choose a date or `responder` to talk to the user. Give an instruction to the next agent.

Current progress:
- chief_complaint: {chief_complaint}
- hospital: {hospital}

If another agent left an instruction, follow it: {instruction}"#;

const DATE_PICKER_PROMPT: &str = r#"You are a scheduling agent tasked with selecting a suitable date for the hospital visit.

Hospital schedules:
- BV Chợ Rẫy: Monday to Saturday, 8 AM to 4 PM.
- BV ĐH Y Dược: Monday to Sunday, 10 AM to 5 PM.
- BV Ung Bướu: Monday to Saturday, 8 AM to 4 PM.

Instructions:
- Ask the user for their preferred date and time.
- Verify that the chosen date fits the hospital's schedule.
- Ensure the date is in the future (now it is {today}).
- Your next agent is `responder`; give it an instruction to finalize the booking.
- The date must be in ISO 8601 format. Leave it empty while the user has not chosen one, and tell the responder to ask for it.

Current booking details:
- hospital: {hospital}
- date: {date}

If another agent left an instruction, follow it: {instruction}"#;

const RESPONDER_PROMPT: &str = r#"You are a helpful AI Assistant finalizing the hospital booking process.
You are coordinating with and assisted by the other agents (`hospital_finder`, `date_picker`).

Current booking details:
- Chief complaint: {chief_complaint}
- Hospital: {hospital}
- Date: {date}

Instructions:
- If another agent left an instruction, follow it: {instruction}
- The required booking details are chief complaint, hospital, and date.
- For the time, use "HH:MM DD-MMM-YYYY (GMT+07)" when communicating with the user.
- If any of the booking details is unclear or missing, ask the user.
- When everything is clear, confirm the booking details with the user.
- Always respond in the same language as the user."#;

/// Worker to route to next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Worker {
    HospitalFinder,
    DatePicker,
    Responder,
}

impl Worker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Worker::HospitalFinder => HOSPITAL_FINDER,
            Worker::DatePicker => DATE_PICKER,
            Worker::Responder => RESPONDER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub enum Hospital {
    #[serde(rename = "BV ĐH Y Dược")]
    DhYDuoc,
    #[serde(rename = "BV Chợ Rẫy")]
    ChoRay,
    #[serde(rename = "BV Ung Bướu")]
    UngBuou,
}

impl Hospital {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hospital::DhYDuoc => "BV ĐH Y Dược",
            Hospital::ChoRay => "BV Chợ Rẫy",
            Hospital::UngBuou => "BV Ung Bướu",
        }
    }
}

/// Next agent after the hospital finder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinderNext {
    DatePicker,
    Responder,
}

/// Worker to route to next, with an instruction for it
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SupervisorResponse {
    pub next: Worker,
    pub instruction: String,
}

impl StructuredResponse for SupervisorResponse {
    fn into_update(self) -> StateUpdate {
        StateUpdate::new()
            .next(self.next.as_str())
            .instruction(self.instruction)
    }
}

/// Chief complaint and the hospital chosen for it
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GeneralPractitionerResponse {
    /// Chief complaint provided by the user
    pub chief_complaint: String,
    /// Selected hospital based on the user's input
    pub hospital: Hospital,
    pub next: FinderNext,
    /// Follow-up notes for the next agent
    pub instruction: String,
}

impl StructuredResponse for GeneralPractitionerResponse {
    fn into_update(self) -> StateUpdate {
        let next = match self.next {
            FinderNext::DatePicker => DATE_PICKER,
            FinderNext::Responder => RESPONDER,
        };
        StateUpdate::new()
            .slot("chief_complaint", self.chief_complaint)
            .slot("hospital", self.hospital.as_str())
            .next(next)
            .instruction(self.instruction)
    }
}

/// Preferred visit date, once the user has named one
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DatePickerResponse {
    /// Preferred date or date and time, ISO 8601 (e.g. 2024-12-10 or 2024-12-10T09:30:00).
    /// Empty while the user has not chosen a date.
    #[serde(default, deserialize_with = "iso_8601")]
    #[schemars(with = "Option<String>")]
    pub date: Option<String>,
    /// Follow-up notes for the responder
    pub instruction: String,
}

impl StructuredResponse for DatePickerResponse {
    fn into_update(self) -> StateUpdate {
        let update = StateUpdate::new().instruction(self.instruction);
        match self.date {
            Some(date) => update.slot("date", date),
            None => update,
        }
    }
}

/// Accept an ISO 8601 date, local date-time, or offset date-time.
/// A missing or blank value means no date has been chosen yet.
fn iso_8601<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let valid = NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok();
    if valid {
        Ok(Some(value.to_string()))
    } else {
        Err(serde::de::Error::custom(format!(
            "'{}' is not an ISO 8601 date",
            raw
        )))
    }
}

pub struct HospitalBooking {
    provider: Arc<dyn ModelProvider>,
    extraction_retries: usize,
}

impl HospitalBooking {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            extraction_retries: 1,
        }
    }

    pub fn with_extraction_retries(mut self, retries: usize) -> Self {
        self.extraction_retries = retries;
        self
    }

    fn schema() -> SlotSchema {
        SlotSchema::new()
            .slot("chief_complaint", FieldType::String, ReducerType::Overwrite)
            .slot("hospital", FieldType::String, ReducerType::Overwrite)
            .slot("date", FieldType::String, ReducerType::Overwrite)
            .slot("today", FieldType::String, ReducerType::Overwrite)
    }
}

impl Workflow for HospitalBooking {
    fn name(&self) -> &str {
        NAME
    }

    fn profile(&self) -> ChatProfile {
        ChatProfile {
            name: NAME.to_string(),
            markdown_description: "An assistant that helps with hospital bookings by selecting the appropriate hospital and scheduling based on the user's needs.".to_string(),
            icon: "https://cdn3.iconfinder.com/data/icons/hospital-outline/128/hospital-bed.png".to_string(),
            default: false,
            starters: vec![],
        }
    }

    fn capabilities(&self) -> &[ModelCapability] {
        CAPABILITIES
    }

    fn settings(&self, models: &ModelCatalog) -> ChatSettings {
        ChatSettings::model_select(models.list_models(CAPABILITIES), InitialModel::Last)
    }

    fn default_state(&self) -> ChatState {
        let today = Local::now().format("%-I:%M %p, %A, %B %-d, %Y (UTC%:z)").to_string();
        let mut state = ChatState::new(NAME, DEFAULT_MODEL, &Self::schema()).with_next(RESPONDER);
        state.apply(StateUpdate::new().slot("today", today));
        state
    }

    fn build_graph(&self) -> Result<CompiledGraph, GraphError> {
        let supervisor = StructuredAgent::<SupervisorResponse>::new(
            SUPERVISOR,
            SUPERVISOR_PROMPT,
            self.provider.clone(),
        )
        .with_extraction_retries(self.extraction_retries);
        let hospital_finder = StructuredAgent::<GeneralPractitionerResponse>::new(
            HOSPITAL_FINDER,
            HOSPITAL_FINDER_PROMPT,
            self.provider.clone(),
        )
        .with_extraction_retries(self.extraction_retries);
        let date_picker = StructuredAgent::<DatePickerResponse>::new(
            DATE_PICKER,
            DATE_PICKER_PROMPT,
            self.provider.clone(),
        )
        .with_extraction_retries(self.extraction_retries);
        let responder = ChatAgent::new(RESPONDER, RESPONDER_PROMPT, self.provider.clone());

        let router = NextFieldRouter::new([HOSPITAL_FINDER, DATE_PICKER]).with_default(RESPONDER);

        let mut graph = StateGraph::new(NAME);
        graph
            .add_node(SUPERVISOR, Arc::new(supervisor))
            .add_node(HOSPITAL_FINDER, Arc::new(hospital_finder))
            .add_node(DATE_PICKER, Arc::new(date_picker))
            .add_node(RESPONDER, Arc::new(responder))
            .set_entry_point(SUPERVISOR)
            .add_conditional_edges(SUPERVISOR, Arc::new(router))
            .add_edge(HOSPITAL_FINDER, DATE_PICKER)
            .add_edge(DATE_PICKER, RESPONDER)
            .add_edge(RESPONDER, END);
        graph.compile()
    }
}
