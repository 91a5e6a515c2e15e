use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::executor::types::normalize_path;

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Style,
    MissingDependency,
    Incomplete,
    Integrity,
    Crash,
}

impl Severity {
    /// Style findings are reported but never turned into fix tasks.
    pub fn is_escalated(&self) -> bool {
        *self != Severity::Style
    }

    /// Priority of the fix task for a defect of this severity.
    pub fn fix_priority(&self) -> i32 {
        match self {
            Severity::Crash => 1,
            Severity::Integrity => 2,
            Severity::Incomplete => 3,
            Severity::MissingDependency => 4,
            Severity::Style => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Style => "style",
            Severity::MissingDependency => "missing_dependency",
            Severity::Incomplete => "incomplete",
            Severity::Integrity => "integrity",
            Severity::Crash => "crash",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    pub severity: Severity,
    pub description: String,
    /// Smallest set of paths a fix needs to touch.
    #[serde(default)]
    pub scope: BTreeSet<String>,
}

impl Defect {
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Self {
            severity,
            description: description.into(),
            scope: BTreeSet::new(),
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
}

/// Drop style findings and order the rest most severe first. Ties keep input order.
pub fn rank_defects(defects: Vec<Defect>) -> Vec<Defect> {
    let mut ranked: Vec<Defect> = defects
        .into_iter()
        .filter(|d| d.severity.is_escalated())
        .collect();
    ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
    ranked
}
