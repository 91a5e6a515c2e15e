use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::executor::artifacts::Artifact;
use crate::executor::types::Handoff;
use crate::review::Defect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    /// Review gate over newly finished tasks.
    Gate,
    /// Periodic pass over the whole artifact set.
    Reconcile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub kind: ReviewKind,
    pub scope: BTreeSet<String>,
    pub artifacts: BTreeMap<String, Artifact>,
    pub criteria: Vec<String>,
    #[serde(default)]
    pub handoffs: Vec<Handoff>,
    pub revision: u32,
}

/// Inspects artifacts and reports defects. Selection and fix planning belong to the caller.
#[async_trait]
pub trait ReviewerPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn inspect(&self, request: &ReviewRequest) -> anyhow::Result<Vec<Defect>>;
}
