use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::types::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    JobStarted,
    PlanningTurn,
    BatchAdmitted,
    BatchRejected,
    SubplannerStarted,
    TaskDispatched,
    TaskStarted,
    TaskCompleted,
    TaskBlocked,
    ReviewPassed,
    ReviewFailed,
    ReconcilerIssue,
    RevisionLimitReached,
    JobDone,
    #[serde(other)]
    Unknown,
}

/// One line of the job event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            task_id: None,
            parent_id: None,
            domain: None,
            description: None,
            status: None,
            data: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Fill task identity fields. Descriptions are shortened for the stream.
    pub fn for_task(event_type: EventType, task: &Task) -> Self {
        let mut ev = Self::new(event_type);
        ev.task_id = Some(task.id.clone());
        ev.parent_id = task.parent_id.clone();
        ev.domain = Some(task.domain.to_string());
        ev.description = Some(preview(&task.description));
        ev
    }

    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// First 120 bytes of `s` on a char boundary, with an ellipsis when cut.
pub fn preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push('…');
    out
}
