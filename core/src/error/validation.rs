use thiserror::Error;

use crate::executor::types::Domain;

/// Reasons a batch is refused admission into the task graph.
///
/// Admission is all-or-nothing, so any of these rejects the whole batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty task ID in batch")]
    EmptyTaskId,

    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error(
        "Scope conflict: '{first}' and '{second}' both claim {paths:?} with no dependency ordering"
    )]
    ScopeConflict {
        first: String,
        second: String,
        paths: Vec<String>,
    },

    #[error("Unknown domain tag: '{0}'")]
    UnknownDomain(String),

    #[error("Domain policy: task '{task_id}' ({domain}) must depend on at least one {required} task")]
    DomainPolicy {
        task_id: String,
        domain: Domain,
        required: Domain,
    },

    #[error("Scope outside parent: task '{task_id}' claims {paths:?} not owned by '{parent_id}'")]
    ScopeOutsideParent {
        task_id: String,
        parent_id: String,
        paths: Vec<String>,
    },
}

impl ValidationError {
    /// Stable code used in event payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTaskId => "empty_task_id",
            Self::DuplicateTaskId(_) => "duplicate_task_id",
            Self::DependencyNotFound { .. } => "dependency_not_found",
            Self::CircularDependency(_) => "circular_dependency",
            Self::ScopeConflict { .. } => "scope_conflict",
            Self::UnknownDomain(_) => "unknown_domain",
            Self::DomainPolicy { .. } => "domain_policy",
            Self::ScopeOutsideParent { .. } => "scope_outside_parent",
        }
    }
}
