use serde::{Deserialize, Serialize};

use super::task::Task;

/// One planner turn: a rewritten scratchpad plus new tasks, admitted atomically.
///
/// An empty task list is the planner's only termination signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub scratchpad: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Batch {
    pub fn new(scratchpad: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            scratchpad: scratchpad.into(),
            tasks,
        }
    }

    pub fn done(scratchpad: impl Into<String>) -> Self {
        Self::new(scratchpad, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }
}
