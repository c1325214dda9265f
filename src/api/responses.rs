use crate::scoring::FocusBand;
use crate::state::SessionPhase;
use crate::tracking::{FocusSample, PersonId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DisplayResponse {
    pub label: String,
    pub score: u8,
    pub band: FocusBand,
    pub average: u8,
    pub history: Vec<FocusSample>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EventEntry {
    pub time: u64,
    pub clock: String,
    pub person_id: PersonId,
    pub label: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventsResponse {
    pub events: Vec<EventEntry>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LeaderboardEntry {
    pub person_id: PersonId,
    pub label: String,
    pub average_focus: u8,
    pub band: FocusBand,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryResponse {
    pub duration_secs: u64,
    pub duration_clock: String,
    pub overall_average: u8,
    pub overall_band: FocusBand,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub events: Vec<EventEntry>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionStatusResponse {
    pub phase: SessionPhase,
    pub elapsed_secs: u64,
    pub clock: String,
    pub tracked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<PersonId>,
    pub summary_available: bool,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub person_id: Option<PersonId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoSummary,
    UnknownPerson,
    SessionActive,
    DriverUnavailable,
    InternalError,
}
