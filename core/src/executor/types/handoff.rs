use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::task::{TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffStatus {
    Complete,
    Partial,
    Blocked,
    Failed,
}

impl HandoffStatus {
    /// Status the task takes in the graph. Partial work does not satisfy dependents.
    pub fn task_status(&self) -> TaskStatus {
        match self {
            HandoffStatus::Complete => TaskStatus::Complete,
            HandoffStatus::Partial | HandoffStatus::Failed => TaskStatus::Failed,
            HandoffStatus::Blocked => TaskStatus::Blocked,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffStatus::Complete => "complete",
            HandoffStatus::Partial => "partial",
            HandoffStatus::Blocked => "blocked",
            HandoffStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffMetrics {
    #[serde(default)]
    pub files_created: u32,
    #[serde(default)]
    pub files_modified: u32,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub duration_ms: u64,
}

impl HandoffMetrics {
    pub fn accumulate(&mut self, other: &HandoffMetrics) {
        self.files_created += other.files_created;
        self.files_modified += other.files_modified;
        self.tokens_used += other.tokens_used;
        self.duration_ms += other.duration_ms;
    }
}

/// Result of executing one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub task_id: TaskId,
    pub status: HandoffStatus,
    #[serde(default)]
    pub summary: String,
    /// Path to content. A later revision touching the same path supersedes it.
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub metrics: HandoffMetrics,
}

impl Handoff {
    pub fn new(task_id: impl Into<String>, status: HandoffStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            summary: String::new(),
            artifacts: BTreeMap::new(),
            concerns: Vec::new(),
            suggestions: Vec::new(),
            metrics: HandoffMetrics::default(),
        }
    }

    pub fn complete(task_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(task_id, HandoffStatus::Complete).with_summary(summary)
    }

    /// A failed handoff whose reason is also surfaced as a concern.
    pub fn failed(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(task_id, HandoffStatus::Failed)
            .with_summary(reason.clone())
            .with_concern(reason)
    }

    pub fn blocked(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(task_id, HandoffStatus::Blocked)
            .with_summary(reason.clone())
            .with_concern(reason)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_artifact(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.artifacts.insert(path.into(), content.into());
        self
    }

    pub fn with_concern(mut self, concern: impl Into<String>) -> Self {
        self.concerns.push(concern.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == HandoffStatus::Complete
    }
}
