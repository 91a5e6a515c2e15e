use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::router::DepartmentRouter;
use super::types::{scope_overlap, Batch, Domain, Handoff, Task, TaskId, TaskStatus};
use crate::error::{ProtocolError, ValidationError};

#[derive(Debug, Clone)]
struct TaskNode {
    task: Task,
    status: TaskStatus,
    handoff: Option<Handoff>,
}

/// Admitted tasks, their dependency edges, scope claims and status.
///
/// Owned by the job controller, which is the only writer. Readers take a clone.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Task nodes: task_id -> node
    nodes: HashMap<TaskId, TaskNode>,

    /// Dependency edges: task_id -> list of dependencies
    edges: HashMap<TaskId, Vec<TaskId>>,

    /// Reverse edges: task_id -> list of tasks that depend on it
    reverse_edges: HashMap<TaskId, Vec<TaskId>>,

    /// Original insertion order (for stable sorting)
    insertion_order: Vec<TaskId>,

    router: DepartmentRouter,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_router(router: DepartmentRouter) -> Self {
        Self {
            router,
            ..Self::default()
        }
    }

    pub fn router(&self) -> &DepartmentRouter {
        &self.router
    }

    /// Validate and admit a batch. Either every task is admitted or none is.
    ///
    /// Checks, in order: ids are non-empty and new, dependencies are known, the
    /// graph stays acyclic, the domain dependency policy holds, and no two
    /// non-terminal tasks with overlapping scope lack an ordering.
    pub fn admit(&mut self, batch: &Batch) -> Result<Vec<TaskId>, ValidationError> {
        {
            let view = AdmissionView::new(self, batch)?;
            view.check_dependencies()?;
            if let Some(cycle) = view.detect_cycle() {
                return Err(ValidationError::CircularDependency(cycle));
            }
            for task in &batch.tasks {
                self.router
                    .validate_dependency_policy(task, |id| view.domain_of(id))?;
            }
            view.check_scopes()?;
        }

        let ids = batch.ids();
        for task in &batch.tasks {
            self.insert(task.clone());
        }
        for id in &ids {
            self.promote_if_ready(id);
        }

        debug!(admitted = ids.len(), total = self.nodes.len(), "batch admitted");
        Ok(ids)
    }

    fn insert(&mut self, task: Task) {
        let task_id = task.id.clone();
        let dependencies: Vec<TaskId> = task.depends_on.iter().cloned().collect();

        for dep in &dependencies {
            self.reverse_edges
                .entry(dep.clone())
                .or_default()
                .push(task_id.clone());
        }
        self.edges.insert(task_id.clone(), dependencies);
        self.insertion_order.push(task_id.clone());
        self.nodes.insert(
            task_id,
            TaskNode {
                task,
                status: TaskStatus::Created,
                handoff: None,
            },
        );
    }

    fn promote_if_ready(&mut self, id: &str) {
        let satisfied = self.edges.get(id).is_some_and(|deps| {
            deps.iter().all(|d| {
                self.nodes
                    .get(d)
                    .is_some_and(|n| n.status == TaskStatus::Complete)
            })
        });
        if let Some(node) = self.nodes.get_mut(id) {
            if node.status == TaskStatus::Created && satisfied {
                node.status = TaskStatus::Ready;
            }
        }
    }

    /// Ready, undispatched tasks ordered by priority then insertion order.
    pub fn ready_tasks(&self) -> Vec<Task> {
        let mut ready: Vec<(usize, &TaskNode)> = self
            .insertion_order
            .iter()
            .enumerate()
            .filter_map(|(seq, id)| {
                self.nodes
                    .get(id)
                    .filter(|n| n.status == TaskStatus::Ready)
                    .map(|n| (seq, n))
            })
            .collect();
        ready.sort_by_key(|(seq, node)| (node.task.priority, *seq));
        ready.into_iter().map(|(_, n)| n.task.clone()).collect()
    }

    pub fn mark_dispatched(&mut self, id: &str) -> Result<(), ProtocolError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ProtocolError::UnknownTask(id.to_string()))?;
        match node.status {
            TaskStatus::Ready => {
                node.status = TaskStatus::Dispatched;
                Ok(())
            }
            status if status.is_terminal() => Err(ProtocolError::AlreadyTerminal {
                task_id: id.to_string(),
                status,
            }),
            status => Err(ProtocolError::NotReady {
                task_id: id.to_string(),
                status,
            }),
        }
    }

    pub fn mark_complete(&mut self, id: &str, handoff: Handoff) -> Result<(), ProtocolError> {
        self.finish(id, TaskStatus::Complete, handoff)
    }

    pub fn mark_failed(&mut self, id: &str, handoff: Handoff) -> Result<(), ProtocolError> {
        self.finish(id, TaskStatus::Failed, handoff)
    }

    /// Blocked is the one terminal status reachable without dispatch.
    pub fn mark_blocked(&mut self, id: &str, handoff: Handoff) -> Result<(), ProtocolError> {
        self.finish(id, TaskStatus::Blocked, handoff)
    }

    /// Record a handoff using its own status. Partial work counts as failed.
    pub fn apply_handoff(&mut self, handoff: Handoff) -> Result<TaskStatus, ProtocolError> {
        let status = handoff.status.task_status();
        let id = handoff.task_id.clone();
        self.finish(&id, status, handoff)?;
        Ok(status)
    }

    fn finish(
        &mut self,
        id: &str,
        status: TaskStatus,
        handoff: Handoff,
    ) -> Result<(), ProtocolError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ProtocolError::UnknownTask(id.to_string()))?;

        if node.status.is_terminal() {
            return Err(ProtocolError::AlreadyTerminal {
                task_id: id.to_string(),
                status: node.status,
            });
        }
        if node.status != TaskStatus::Dispatched && status != TaskStatus::Blocked {
            return Err(ProtocolError::NotDispatched {
                task_id: id.to_string(),
                status: node.status,
            });
        }
        if handoff.task_id != id {
            return Err(ProtocolError::HandoffMismatch {
                expected: id.to_string(),
                got: handoff.task_id,
            });
        }

        node.status = status;
        node.handoff = Some(handoff);

        if status == TaskStatus::Complete {
            let dependents = self.reverse_edges.get(id).cloned().unwrap_or_default();
            for dependent in dependents {
                self.promote_if_ready(&dependent);
            }
        }
        Ok(())
    }

    /// Block every waiting task with a failed or blocked dependency, transitively.
    ///
    /// Returns the synthesized handoffs so callers can record them.
    pub fn block_unreachable(&mut self) -> Vec<Handoff> {
        let mut blocked = Vec::new();
        loop {
            let mut changed = false;
            for id in &self.insertion_order {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                if node.status != TaskStatus::Created {
                    continue;
                }
                let failed_dep = self.edges.get(id).and_then(|deps| {
                    deps.iter().find_map(|d| {
                        let status = self.nodes.get(d)?.status;
                        matches!(status, TaskStatus::Failed | TaskStatus::Blocked)
                            .then(|| (d.clone(), status))
                    })
                });
                if let Some((dep, status)) = failed_dep {
                    let handoff =
                        Handoff::blocked(id.clone(), format!("dependency '{dep}' ended {status}"));
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.status = TaskStatus::Blocked;
                        node.handoff = Some(handoff.clone());
                    }
                    blocked.push(handoff);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        blocked
    }

    /// Add dependencies so `task` runs after every pending task whose scope it overlaps.
    ///
    /// Used for review fixes, which are built from defects rather than planned
    /// against the graph.
    pub fn order_after_conflicts(&self, task: &mut Task) {
        for id in &self.insertion_order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.status.is_terminal() || node.task.id == task.id {
                continue;
            }
            if !scope_overlap(&task.scope, &node.task.scope).is_empty() {
                task.depends_on.insert(id.clone());
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.nodes.get(id).map(|n| &n.task)
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    pub fn handoff(&self, id: &str) -> Option<&Handoff> {
        self.nodes.get(id).and_then(|n| n.handoff.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn outstanding_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| !n.status.is_terminal())
            .count()
    }

    pub fn completed_ids(&self) -> Vec<TaskId> {
        self.tasks_by_status(TaskStatus::Complete)
            .into_iter()
            .map(|t| t.id.clone())
            .collect()
    }

    /// Tasks with `status`, in insertion order.
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.status == status)
            .map(|n| &n.task)
            .collect()
    }

    /// Number of delegation hops between `id` and the root planner.
    pub fn depth(&self, id: &str) -> u32 {
        let mut depth = 0;
        let mut seen = HashSet::new();
        let mut current = self.get(id).and_then(|t| t.parent_id.clone());
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            depth += 1;
            current = self.get(&parent).and_then(|t| t.parent_id.clone());
        }
        depth
    }
}

/// Read-only view over the graph plus a staged batch, used during admission.
struct AdmissionView<'a> {
    graph: &'a TaskGraph,
    batch: &'a Batch,
    staged: HashMap<&'a str, &'a Task>,
}

impl<'a> AdmissionView<'a> {
    fn new(graph: &'a TaskGraph, batch: &'a Batch) -> Result<Self, ValidationError> {
        let mut staged = HashMap::new();
        for task in &batch.tasks {
            if task.id.trim().is_empty() {
                return Err(ValidationError::EmptyTaskId);
            }
            if graph.nodes.contains_key(&task.id)
                || staged.insert(task.id.as_str(), task).is_some()
            {
                return Err(ValidationError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(Self {
            graph,
            batch,
            staged,
        })
    }

    fn task(&self, id: &str) -> Option<&'a Task> {
        self.staged
            .get(id)
            .copied()
            .or_else(|| self.graph.nodes.get(id).map(|n| &n.task))
    }

    fn domain_of(&self, id: &str) -> Option<Domain> {
        self.task(id).map(|t| t.domain)
    }

    fn check_dependencies(&self) -> Result<(), ValidationError> {
        for task in &self.batch.tasks {
            for dep in &task.depends_on {
                if self.task(dep).is_none() {
                    return Err(ValidationError::DependencyNotFound {
                        task_id: task.id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Detect circular dependencies using DFS.
    ///
    /// Admitted tasks never depend on staged ones, so only staged nodes can be
    /// part of a new cycle.
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task in &self.batch.tasks {
            if !visited.contains(&task.id) && self.dfs_cycle(&task.id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(task) = self.staged.get(node) {
            for dep in &task.depends_on {
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if self.staged.contains_key(dep.as_str())
                    && !visited.contains(dep)
                    && self.dfs_cycle(dep, visited, stack)
                {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }

    /// True if `to` is a transitive dependency of `from`.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![from];
        while let Some(id) = pending.pop() {
            let Some(task) = self.task(id) else {
                continue;
            };
            for dep in &task.depends_on {
                if dep == to {
                    return true;
                }
                if seen.insert(dep.as_str()) {
                    pending.push(dep.as_str());
                }
            }
        }
        false
    }

    /// `id` followed by its delegation ancestors.
    fn lineage(&self, id: &'a str) -> Vec<&'a str> {
        let mut chain = vec![id];
        let mut current = self.task(id).and_then(|t| t.parent_id.as_deref());
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.task(parent).and_then(|t| t.parent_id.as_deref());
        }
        chain
    }

    /// Two tasks are ordered when one contains the other through delegation, or
    /// when some ancestor-or-self of one depends on an ancestor-or-self of the other.
    fn ordered(&self, a: &'a str, b: &'a str) -> bool {
        let la = self.lineage(a);
        let lb = self.lineage(b);
        if la.contains(&b) || lb.contains(&a) {
            return true;
        }
        la.iter().any(|x| {
            lb.iter()
                .any(|y| x != y && (self.reaches(x, y) || self.reaches(y, x)))
        })
    }

    fn check_scopes(&self) -> Result<(), ValidationError> {
        let pending: Vec<&'a Task> = self
            .graph
            .insertion_order
            .iter()
            .filter_map(|id| self.graph.nodes.get(id))
            .filter(|n| !n.status.is_terminal())
            .map(|n| &n.task)
            .collect();

        for (i, task) in self.batch.tasks.iter().enumerate() {
            if task.scope.is_empty() {
                continue;
            }
            let others = self.batch.tasks[i + 1..]
                .iter()
                .chain(pending.iter().copied());
            for other in others {
                let shared = scope_overlap(&task.scope, &other.scope);
                if !shared.is_empty() && !self.ordered(&task.id, &other.id) {
                    return Err(ValidationError::ScopeConflict {
                        first: task.id.clone(),
                        second: other.id.clone(),
                        paths: shared,
                    });
                }
            }
        }
        Ok(())
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}
