use chrono::{DateTime, Utc};

use super::session::{CycleId, LatestEnvelope};
use crate::models::StepResult;

pub const EMPTY_LOG_MESSAGE: &str = "No active logs. Execute a task to see verification data.";
pub const NO_PLAN_MESSAGE: &str = "Planner produced no tool steps for this request.";

/// Read-only projection of the latest envelope's raw step results.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityLogView {
    Empty,
    Populated(IntegrityLogReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityLogReport {
    pub cycle: CycleId,
    pub query: String,
    pub received_at: DateTime<Utc>,
    pub planner_found_no_steps: bool,
    pub entries: Vec<IntegrityLogEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityLogEntry {
    pub tool: String,
    pub reason: String,
    pub status_label: String,
    pub succeeded: bool,
    pub detail: EntryDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryDetail {
    /// Pretty-printed JSON of the step output.
    Output(String),
    Error(String),
    Missing,
}

impl IntegrityLogView {
    pub fn project(latest: Option<&LatestEnvelope>) -> Self {
        let Some(latest) = latest else {
            return Self::Empty;
        };

        Self::Populated(IntegrityLogReport {
            cycle: latest.cycle,
            query: latest.query.clone(),
            received_at: latest.received_at,
            planner_found_no_steps: latest.response.planner_found_no_steps(),
            entries: latest
                .response
                .results()
                .iter()
                .map(IntegrityLogEntry::from_step)
                .collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl IntegrityLogEntry {
    fn from_step(result: &StepResult) -> Self {
        let detail = match (result.output(), result.error.as_deref()) {
            (Some(output), _) => serde_json::to_string_pretty(output)
                .map(EntryDetail::Output)
                .unwrap_or_else(|_| EntryDetail::Output(output.to_string())),
            (None, Some(error)) => EntryDetail::Error(error.to_string()),
            (None, None) => EntryDetail::Missing,
        };

        Self {
            tool: result.step.tool.clone(),
            reason: result.step.reason.clone(),
            status_label: result.status.label(),
            succeeded: result.status.is_success(),
            detail,
        }
    }
}
