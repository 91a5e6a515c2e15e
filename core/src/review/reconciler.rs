use std::sync::Arc;

use tracing::debug;

use super::budget::RevisionBudget;
use super::gate::{judge, FixFactory, ReviewResult};
use crate::error::ProtocolError;
use crate::executor::traits::{ReviewRequest, ReviewerPlugin};
use crate::planner::{with_retries, RetryPolicy};

/// Periodic health pass over the whole artifact set.
///
/// Shares fix mechanics and the revision budget with the review gate.
pub struct Reconciler {
    reviewer: Arc<dyn ReviewerPlugin>,
    fixes: FixFactory,
    interval_cycles: u32,
    sweeps: u32,
}

impl Reconciler {
    pub fn new(reviewer: Arc<dyn ReviewerPlugin>, interval_cycles: u32, max_fixes: usize) -> Self {
        Self {
            reviewer,
            fixes: FixFactory::new("reconcile", max_fixes),
            interval_cycles,
            sweeps: 0,
        }
    }

    /// True on every `interval_cycles`-th completed controller cycle.
    pub fn is_due(&self, cycle: u32) -> bool {
        self.interval_cycles > 0 && cycle > 0 && cycle % self.interval_cycles == 0
    }

    pub fn sweeps(&self) -> u32 {
        self.sweeps
    }

    pub async fn sweep(
        &mut self,
        request: &ReviewRequest,
        budget: &mut RevisionBudget,
        retry: &RetryPolicy,
        taken: &(dyn Fn(&str) -> bool + Sync),
    ) -> Result<ReviewResult, ProtocolError> {
        self.sweeps += 1;
        debug!(sweep = self.sweeps, artifacts = request.artifacts.len(), "reconciler sweep");
        let reviewer = self.reviewer.clone();
        let defects = with_retries(retry, "reconciler", || reviewer.inspect(request)).await?;
        Ok(judge(defects, &request.criteria, budget, &self.fixes, taken))
    }
}
