use thiserror::Error;

use crate::executor::types::TaskStatus;
use crate::job::JobPhase;

/// Violations of the planner/worker protocol or of the task lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Batch too large: {size} tasks exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task '{task_id}' is already terminal ({status})")]
    AlreadyTerminal { task_id: String, status: TaskStatus },

    #[error("Task '{task_id}' is not ready for dispatch ({status})")]
    NotReady { task_id: String, status: TaskStatus },

    #[error("Task '{task_id}' was never dispatched ({status})")]
    NotDispatched { task_id: String, status: TaskStatus },

    #[error("Handoff for '{got}' returned while executing '{expected}'")]
    HandoffMismatch { expected: String, got: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: JobPhase, to: JobPhase },

    #[error("{capability} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        capability: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Job stalled with {outstanding} outstanding tasks and no active planners")]
    Stalled { outstanding: usize },
}
