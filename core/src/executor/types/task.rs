use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::scope::normalize_path;
use crate::error::ValidationError;

pub type TaskId = String;

/// Priority assigned to original planner work when none is given.
pub const DEFAULT_PRIORITY: i32 = 5;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Closed set of domain tags. Parsing anything else is an `UnknownDomain` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Domain {
    Architecture,
    Implementation,
    Testing,
    Integration,
    Product,
    Engineering,
    Quality,
}

impl Default for Domain {
    fn default() -> Self {
        Domain::Engineering
    }
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Architecture,
        Domain::Implementation,
        Domain::Testing,
        Domain::Integration,
        Domain::Product,
        Domain::Engineering,
        Domain::Quality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Architecture => "architecture",
            Domain::Implementation => "implementation",
            Domain::Testing => "testing",
            Domain::Integration => "integration",
            Domain::Product => "product",
            Domain::Engineering => "engineering",
            Domain::Quality => "quality",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "architecture" => Ok(Domain::Architecture),
            "implementation" => Ok(Domain::Implementation),
            "testing" => Ok(Domain::Testing),
            "integration" => Ok(Domain::Integration),
            "product" => Ok(Domain::Product),
            "engineering" => Ok(Domain::Engineering),
            "quality" => Ok(Domain::Quality),
            _ => Err(ValidationError::UnknownDomain(s.to_string())),
        }
    }
}

impl TryFrom<String> for Domain {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.as_str().to_string()
    }
}

/// Lifecycle: `created -> ready -> dispatched -> {complete | failed | blocked}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Created,
    Ready,
    Dispatched,
    Complete,
    Failed,
    Blocked,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::Failed | TaskStatus::Blocked
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Ready => "ready",
            TaskStatus::Dispatched => "dispatched",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work produced by a planner, the review gate or the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    /// Paths this task may modify. An entry ending in `/` claims a directory.
    #[serde(default)]
    pub scope: BTreeSet<String>,
    #[serde(default, alias = "team")]
    pub domain: Domain,
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
    /// Lower is more urgent.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Fix-cycle generation, 0 for original work.
    #[serde(default)]
    pub revision: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub acceptance: String,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            scope: BTreeSet::new(),
            domain: Domain::default(),
            depends_on: BTreeSet::new(),
            priority: DEFAULT_PRIORITY,
            revision: 0,
            parent_id: None,
            acceptance: String::new(),
        }
    }

    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scope = scope
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_acceptance(mut self, acceptance: impl Into<String>) -> Self {
        self.acceptance = acceptance.into();
        self
    }
}
