use std::sync::Arc;

use tracing::{debug, info};

use super::budget::RevisionBudget;
use super::defect::{rank_defects, Defect, Severity};
use crate::error::ProtocolError;
use crate::executor::traits::{ReviewRequest, ReviewerPlugin};
use crate::executor::types::{scope_overlap, Domain, Task};
use crate::planner::{with_retries, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewResult {
    /// No escalated defects. Style findings are kept as notes.
    Pass { notes: Vec<Defect> },
    /// A fix batch at a freshly claimed revision.
    Fail {
        revision: u32,
        fix_tasks: Vec<Task>,
        defects: Vec<Defect>,
    },
    /// Defects remain but the revision ceiling is reached.
    Exhausted { ceiling: u32, defects: Vec<Defect> },
}

/// Builds bounded fix batches from ranked defects.
#[derive(Debug, Clone)]
pub struct FixFactory {
    prefix: String,
    max_fixes: usize,
}

impl FixFactory {
    pub fn new(prefix: impl Into<String>, max_fixes: usize) -> Self {
        Self {
            prefix: prefix.into(),
            max_fixes,
        }
    }

    /// One fix task per defect, most severe first, at most `max_fixes`.
    ///
    /// A fix whose scope overlaps an earlier fix in the same batch depends on
    /// it. Ids for which `taken` returns true get a numeric suffix.
    pub fn build(
        &self,
        ranked: &[Defect],
        revision: u32,
        criteria: &[String],
        taken: &dyn Fn(&str) -> bool,
    ) -> Vec<Task> {
        let mut fixes: Vec<Task> = Vec::new();
        for (i, defect) in ranked.iter().take(self.max_fixes).enumerate() {
            let id = free_id(format!("{}-r{revision}-{}", self.prefix, i + 1), taken);
            let earlier: Vec<String> = fixes
                .iter()
                .filter(|f| !scope_overlap(&defect.scope, &f.scope).is_empty())
                .map(|f| f.id.clone())
                .collect();
            let task = Task::new(id, fix_description(defect))
                .with_scope(defect.scope.iter())
                .with_domain(Domain::Engineering)
                .with_priority(defect.severity.fix_priority())
                .with_revision(revision)
                .with_acceptance(fix_acceptance(defect, criteria))
                .depends_on(earlier);
            fixes.push(task);
        }
        fixes
    }
}

fn free_id(base: String, taken: &dyn Fn(&str) -> bool) -> String {
    let mut id = base.clone();
    let mut n = 1u32;
    while taken(&id) {
        n += 1;
        id = format!("{base}-{n}");
    }
    id
}

fn fix_description(defect: &Defect) -> String {
    if defect.scope.is_empty() {
        format!("Fix {} defect: {}", defect.severity, defect.description)
    } else {
        let paths: Vec<&str> = defect.scope.iter().map(String::as_str).collect();
        format!(
            "Fix {} defect in {}: {}",
            defect.severity,
            paths.join(", "),
            defect.description
        )
    }
}

fn fix_acceptance(defect: &Defect, criteria: &[String]) -> String {
    let mut text = format!("Resolved: {}", defect.description);
    if !criteria.is_empty() {
        text.push_str("\nStill satisfies: ");
        text.push_str(&criteria.join("; "));
    }
    text
}

/// Turn reviewer findings into a result, claiming a revision only for a fix batch.
///
/// `taken` reports task ids already in use by the job; fix ids avoid them.
pub fn judge(
    defects: Vec<Defect>,
    criteria: &[String],
    budget: &mut RevisionBudget,
    fixes: &FixFactory,
    taken: &dyn Fn(&str) -> bool,
) -> ReviewResult {
    let notes: Vec<Defect> = defects
        .iter()
        .filter(|d| d.severity == Severity::Style)
        .cloned()
        .collect();
    let ranked = rank_defects(defects);
    if ranked.is_empty() {
        return ReviewResult::Pass { notes };
    }

    match budget.advance() {
        Ok(revision) => {
            let fix_tasks = fixes.build(&ranked, revision, criteria, taken);
            debug!(revision, fixes = fix_tasks.len(), defects = ranked.len(), "fix batch built");
            ReviewResult::Fail {
                revision,
                fix_tasks,
                defects: ranked,
            }
        }
        Err(limit) => {
            info!(ceiling = limit.ceiling, defects = ranked.len(), "{limit}");
            ReviewResult::Exhausted {
                ceiling: limit.ceiling,
                defects: ranked,
            }
        }
    }
}

/// Reviews newly finished work and emits bounded fix batches.
pub struct ReviewGate {
    reviewer: Arc<dyn ReviewerPlugin>,
    fixes: FixFactory,
}

impl ReviewGate {
    pub fn new(reviewer: Arc<dyn ReviewerPlugin>, max_fixes_per_sweep: usize) -> Self {
        Self {
            reviewer,
            fixes: FixFactory::new("fix", max_fixes_per_sweep),
        }
    }

    /// Inspect `request` and judge the findings. Reviewer errors are retried
    /// with `retry`; exhaustion is returned as a protocol error.
    pub async fn review(
        &self,
        request: &ReviewRequest,
        budget: &mut RevisionBudget,
        retry: &RetryPolicy,
        taken: &(dyn Fn(&str) -> bool + Sync),
    ) -> Result<ReviewResult, ProtocolError> {
        let reviewer = self.reviewer.clone();
        let defects = with_retries(retry, "reviewer", || reviewer.inspect(request)).await?;
        Ok(judge(defects, &request.criteria, budget, &self.fixes, taken))
    }
}
