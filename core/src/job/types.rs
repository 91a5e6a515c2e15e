use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::executor::artifacts::Artifact;
use crate::executor::router::WorkerPools;
use crate::executor::traits::{PlannerPlugin, ReviewerPlugin};
use crate::executor::types::Handoff;

/// User-visible terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Partial,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Partial => "partial",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job overrides of the `[job]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default)]
    pub revision_ceiling: Option<u32>,
    #[serde(default)]
    pub max_fixes_per_sweep: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// Highest-revision artifact per path.
    pub artifacts: BTreeMap<String, Artifact>,
    /// Fix cycles consumed.
    pub revision: u32,
    /// Every handoff applied to the graph, in application order.
    pub handoffs: Vec<Handoff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cycles: u32,
    pub waves: usize,
}

impl JobOutcome {
    pub fn completed_count(&self) -> usize {
        self.handoffs.iter().filter(|h| h.is_complete()).count()
    }
}

/// Capabilities a job runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub planner: Arc<dyn PlannerPlugin>,
    /// Delegation is disabled when unset.
    pub subplanner: Option<Arc<dyn PlannerPlugin>>,
    pub workers: WorkerPools,
    pub reviewer: Arc<dyn ReviewerPlugin>,
    /// Reconciler sweeps are disabled when unset.
    pub reconciler: Option<Arc<dyn ReviewerPlugin>>,
}

impl Capabilities {
    pub fn new(
        planner: Arc<dyn PlannerPlugin>,
        workers: WorkerPools,
        reviewer: Arc<dyn ReviewerPlugin>,
    ) -> Self {
        Self {
            planner,
            subplanner: None,
            workers,
            reviewer,
            reconciler: None,
        }
    }

    pub fn with_subplanner(mut self, subplanner: Arc<dyn PlannerPlugin>) -> Self {
        self.subplanner = Some(subplanner);
        self
    }

    pub fn with_reconciler(mut self, reconciler: Arc<dyn ReviewerPlugin>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("planner", &self.planner.name())
            .field("subplanner", &self.subplanner.as_ref().map(|p| p.name().to_string()))
            .field("reviewer", &self.reviewer.name())
            .field("reconciler", &self.reconciler.as_ref().map(|r| r.name().to_string()))
            .finish_non_exhaustive()
    }
}
