use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::executor::project::HandoffDigest;
use crate::executor::types::{Batch, Task};

/// What a planning conversation is working towards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    /// The root job description.
    Job { description: String },
    /// A delegated task being decomposed by a subplanner.
    Task { task: Task },
}

impl Objective {
    pub fn description(&self) -> &str {
        match self {
            Objective::Job { description } => description,
            Objective::Task { task } => &task.description,
        }
    }
}

/// Input to one planner turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub objective: Objective,
    pub depth: u32,
    pub turn: u32,
    /// Scratchpad returned by the previous turn, verbatim.
    pub scratchpad: String,
    /// Handoffs received since the previous turn, bounded for the prompt.
    pub prior_handoffs: Vec<HandoffDigest>,
    /// Current project tree, capped.
    #[serde(default)]
    pub file_tree: Vec<String>,
    #[serde(default)]
    pub total_files: usize,
    /// Paths added since this conversation's previous turn.
    #[serde(default)]
    pub new_files: Vec<String>,
    #[serde(default)]
    pub removed_files: Vec<String>,
    /// Corrective feedback after a rejected batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub max_batch_size: usize,
}

/// Stateless batch producer. Conversation state lives with the caller.
#[async_trait]
pub trait PlannerPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn next_batch(&self, request: &PlanRequest) -> anyhow::Result<Batch>;
}
