use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::error::ValidationError;
use crate::executor::types::{paths_overlap, scope_contains, Batch, Handoff, HandoffStatus, Task};

/// Predicate deciding that a delegated task is small enough to run directly.
pub type TrivialPredicate = Arc<dyn Fn(&Task) -> bool + Send + Sync>;

/// When a dispatched task is handed to a subplanner instead of a worker.
#[derive(Clone)]
pub struct SubplanPolicy {
    max_depth: u32,
    trivial: TrivialPredicate,
}

impl fmt::Debug for SubplanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubplanPolicy")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl SubplanPolicy {
    pub fn new(max_depth: u32, trivial: TrivialPredicate) -> Self {
        Self { max_depth, trivial }
    }

    /// Tasks claiming at most `max_scope` paths are trivial.
    pub fn scope_size(max_depth: u32, max_scope: usize) -> Self {
        Self::new(max_depth, Arc::new(move |task: &Task| task.scope.len() <= max_scope))
    }

    pub fn from_config(cfg: &PlannerConfig) -> Self {
        Self::scope_size(cfg.max_depth, cfg.trivial_scope_max)
    }

    pub fn with_trivial(mut self, trivial: TrivialPredicate) -> Self {
        self.trivial = trivial;
        self
    }

    pub fn is_trivial(&self, task: &Task) -> bool {
        (self.trivial)(task)
    }

    /// `depth` is the task's own delegation depth (0 for root-planner tasks).
    pub fn should_decompose(&self, task: &Task, depth: u32) -> bool {
        depth < self.max_depth && !self.is_trivial(task)
    }
}

impl Default for SubplanPolicy {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// Bind a subplanner batch to its parent and check scope containment.
///
/// Children inherit the parent's revision. Root-planner bookkeeping fields
/// set by the subplanner are overwritten.
pub fn prepare_children(parent: &Task, batch: &mut Batch) -> Result<(), ValidationError> {
    for child in &mut batch.tasks {
        let outside: Vec<String> = child
            .scope
            .iter()
            .filter(|p| !scope_contains(&parent.scope, p))
            .cloned()
            .collect();
        if !outside.is_empty() {
            return Err(ValidationError::ScopeOutsideParent {
                task_id: child.id.clone(),
                parent_id: parent.id.clone(),
                paths: outside,
            });
        }
        child.parent_id = Some(parent.id.clone());
        child.revision = child.revision.max(parent.revision);
    }
    Ok(())
}

/// Parent scope entries that no child claim overlaps.
pub fn uncovered_scope<'a, I>(parent: &Task, children: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Task>,
{
    let claimed: BTreeSet<&str> = children
        .into_iter()
        .flat_map(|c| c.scope.iter().map(String::as_str))
        .collect();
    parent
        .scope
        .iter()
        .filter(|entry| !claimed.iter().any(|c| paths_overlap(entry, c)))
        .cloned()
        .collect()
}

/// Fold child handoffs into one handoff for the delegated parent.
///
/// Complete if every child completed, failed if every child failed, partial
/// if at least one completed, blocked otherwise.
pub fn aggregate_handoffs(
    parent: &Task,
    child_count: usize,
    handoffs: &[Handoff],
    uncovered: &[String],
) -> Handoff {
    if child_count == 0 {
        return Handoff::failed(parent.id.clone(), "subplanner produced no subtasks");
    }

    let completed = handoffs.iter().filter(|h| h.is_complete()).count();
    let failed = handoffs
        .iter()
        .filter(|h| h.status == HandoffStatus::Failed)
        .count();

    let status = if completed == child_count {
        HandoffStatus::Complete
    } else if failed == child_count {
        HandoffStatus::Failed
    } else if completed > 0 {
        HandoffStatus::Partial
    } else {
        HandoffStatus::Blocked
    };

    let headline: String = parent.description.chars().take(80).collect();
    let mut summary = format!(
        "Decomposed \"{headline}\" into {child_count} subtasks. {completed} complete, {failed} failed, {} other.\n",
        child_count.saturating_sub(completed + failed),
    );
    for h in handoffs {
        summary.push_str(&format!("\n[{}] ({}): {}", h.task_id, h.status, h.summary));
    }

    let mut handoff = Handoff::new(parent.id.clone(), status).with_summary(summary);
    for h in handoffs {
        handoff
            .concerns
            .extend(h.concerns.iter().map(|c| format!("[{}] {c}", h.task_id)));
        handoff
            .suggestions
            .extend(h.suggestions.iter().map(|s| format!("[{}] {s}", h.task_id)));
        handoff.metrics.accumulate(&h.metrics);
    }
    if !uncovered.is_empty() {
        handoff.concerns.push(format!(
            "subtasks left parent scope uncovered: {}",
            uncovered.join(", ")
        ));
    }
    handoff
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parent() -> Task {
        Task::new("p", "build the game")
            .with_scope(["game/", "main.py", "README.md"])
            .with_revision(2)
    }

    #[test]
    fn trivial_tasks_are_not_decomposed() {
        let policy = SubplanPolicy::scope_size(3, 3);
        let small = Task::new("s", "x").with_scope(["a", "b"]);
        let large = Task::new("l", "x").with_scope(["a", "b", "c", "d"]);
        assert!(!policy.should_decompose(&small, 0));
        assert!(policy.should_decompose(&large, 0));
        assert!(!policy.should_decompose(&large, 3));
    }

    #[test]
    fn custom_predicate_overrides_scope_rule() {
        let policy = SubplanPolicy::scope_size(3, 3)
            .with_trivial(Arc::new(|t: &Task| t.description.starts_with("tiny")));
        let task = Task::new("t", "tiny fix").with_scope(["a", "b", "c", "d"]);
        assert!(!policy.should_decompose(&task, 0));
    }

    #[test]
    fn children_must_stay_inside_parent_scope() {
        let mut ok = Batch::new("", vec![Task::new("c1", "x").with_scope(["game/player.py"])]);
        prepare_children(&parent(), &mut ok).unwrap();
        assert_eq!(ok.tasks[0].parent_id.as_deref(), Some("p"));
        assert_eq!(ok.tasks[0].revision, 2);

        let mut bad = Batch::new("", vec![Task::new("c2", "x").with_scope(["server.py"])]);
        let err = prepare_children(&parent(), &mut bad).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ScopeOutsideParent {
                task_id: "c2".into(),
                parent_id: "p".into(),
                paths: vec!["server.py".into()],
            }
        );
    }

    #[test]
    fn uncovered_scope_lists_unclaimed_entries() {
        let children = vec![
            Task::new("c1", "x").with_scope(["game/a.py"]),
            Task::new("c2", "x").with_scope(["main.py"]),
        ];
        assert_eq!(uncovered_scope(&parent(), &children), vec!["README.md".to_string()]);
    }

    #[test]
    fn aggregate_status_rules() {
        let p = parent();
        let ok = Handoff::complete("c1", "done");
        let bad = Handoff::failed("c2", "broke");
        let blocked = Handoff::blocked("c3", "waiting");

        assert_eq!(
            aggregate_handoffs(&p, 2, &[ok.clone(), ok.clone()], &[]).status,
            HandoffStatus::Complete
        );
        assert_eq!(
            aggregate_handoffs(&p, 2, &[bad.clone(), bad.clone()], &[]).status,
            HandoffStatus::Failed
        );
        assert_eq!(
            aggregate_handoffs(&p, 2, &[ok.clone(), bad.clone()], &[]).status,
            HandoffStatus::Partial
        );
        assert_eq!(
            aggregate_handoffs(&p, 2, &[bad, blocked], &[]).status,
            HandoffStatus::Blocked
        );
    }

    #[test]
    fn aggregate_prefixes_concerns_and_reports_uncovered_scope() {
        let h = Handoff::complete("c1", "done").with_concern("flaky test");
        let agg = aggregate_handoffs(&parent(), 1, &[h], &["README.md".to_string()]);
        assert_eq!(agg.task_id, "p");
        assert_eq!(agg.concerns[0], "[c1] flaky test");
        assert!(agg.concerns[1].contains("README.md"));
        assert!(agg.summary.contains("1 complete"));
    }

    #[test]
    fn aggregate_without_children_fails() {
        let agg = aggregate_handoffs(&parent(), 0, &[], &[]);
        assert_eq!(agg.status, HandoffStatus::Failed);
    }
}
