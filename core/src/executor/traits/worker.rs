use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::executor::types::{Handoff, Task};

/// A task plus the project state a worker needs to carry it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRequest {
    pub task: Task,
    /// Current project tree, capped.
    #[serde(default)]
    pub file_tree: Vec<String>,
    /// Current content of artifacts inside the task's scope.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl WorkRequest {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            file_tree: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, file_tree: Vec<String>, files: BTreeMap<String, String>) -> Self {
        self.file_tree = file_tree;
        self.files = files;
        self
    }
}

/// Executes one task and reports a handoff.
///
/// Implementations are invoked concurrently within a wave and must not share
/// mutable state with each other. A returned error is treated as a failed task.
#[async_trait]
pub trait WorkerPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, request: &WorkRequest) -> anyhow::Result<Handoff>;
}
