use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use super::phase::{JobPhase, PhaseTransition};
use super::types::{Capabilities, JobOptions, JobOutcome, JobStatus};
use crate::config::AppConfig;
use crate::error::ProtocolError;
use crate::events_out::{preview, EventSink, EventType, JobEvent, NoopSink};
use crate::executor::artifacts::ArtifactStore;
use crate::executor::project::{file_tree, scoped_contents};
use crate::executor::router::DepartmentRouter;
use crate::executor::scheduler::Dispatcher;
use crate::executor::traits::{
    ArtifactSinkPlugin, PlannerPlugin, ReviewKind, ReviewRequest, WorkRequest,
};
use crate::executor::types::{Batch, Handoff, Task, TaskId, TaskStatus};
use crate::executor::TaskGraph;
use crate::planner::{
    aggregate_handoffs, prepare_children, uncovered_scope, ConversationKey, ConversationState,
    PlannerArena, RetryPolicy, SubplanPolicy, TrivialPredicate,
};
use crate::review::{Reconciler, ReviewGate, ReviewResult, RevisionBudget};

/// Drives one job from the root objective to a terminal status.
pub struct JobController {
    config: AppConfig,
    options: JobOptions,
    capabilities: Capabilities,
    events: Arc<dyn EventSink>,
    artifact_sink: Option<Arc<dyn ArtifactSinkPlugin>>,
    subplan: SubplanPolicy,
    retry: RetryPolicy,
}

impl JobController {
    pub fn new(capabilities: Capabilities, config: AppConfig) -> Self {
        let subplan = SubplanPolicy::from_config(&config.planner);
        let retry = RetryPolicy::from_config(&config.planner);
        Self {
            config,
            options: JobOptions::default(),
            capabilities,
            events: Arc::new(NoopSink),
            artifact_sink: None,
            subplan,
            retry,
        }
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSinkPlugin>) -> Self {
        self.artifact_sink = Some(sink);
        self
    }

    /// Replace the default scope-size rule for direct execution of delegated tasks.
    pub fn with_trivial(mut self, trivial: TrivialPredicate) -> Self {
        self.subplan = self.subplan.with_trivial(trivial);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn revision_ceiling(&self) -> u32 {
        self.options
            .revision_ceiling
            .unwrap_or(self.config.job.revision_ceiling)
    }

    pub fn max_fixes_per_sweep(&self) -> usize {
        self.options
            .max_fixes_per_sweep
            .unwrap_or(self.config.job.max_fixes_per_sweep)
    }

    pub async fn run(&self, description: &str) -> JobOutcome {
        let mut run = JobRun::new(self, description);
        let result = run.drive().await;
        run.finish(result)
    }
}

/// Run one job with the default controller wiring.
pub async fn run_job(
    description: &str,
    options: JobOptions,
    capabilities: Capabilities,
    config: &AppConfig,
) -> JobOutcome {
    JobController::new(capabilities, config.clone())
        .with_options(options)
        .run(description)
        .await
}

/// Mutable state of a single job. The controller task is its only writer.
struct JobRun<'a> {
    ctl: &'a JobController,
    job_id: String,
    phase: JobPhase,
    graph: TaskGraph,
    arena: PlannerArena,
    dispatcher: Dispatcher,
    gate: ReviewGate,
    reconciler: Option<Reconciler>,
    budget: RevisionBudget,
    store: ArtifactStore,
    handoffs: Vec<Handoff>,
    /// Terminal since the last review gate.
    unreviewed: Vec<TaskId>,
    /// Delegated tasks whose subplanner declined to decompose them.
    direct_queue: Vec<Task>,
    cycles: u32,
    waves: usize,
    ceiling_hit: bool,
    /// A failed review whose fix batch could not be admitted.
    unresolved_review: bool,
}

impl<'a> JobRun<'a> {
    fn new(ctl: &'a JobController, description: &str) -> Self {
        let cfg = &ctl.config;
        let router = DepartmentRouter::new(cfg.planner.enforce_domain_policy);
        let dispatcher = Dispatcher::new(ctl.capabilities.workers.clone(), router)
            .with_max_parallel(cfg.dispatch.max_parallel)
            .with_task_timeout(cfg.dispatch.task_timeout_ms.map(Duration::from_millis))
            .with_events(ctl.events.clone());
        let max_fixes = ctl.max_fixes_per_sweep();
        let reconciler = match &ctl.capabilities.reconciler {
            Some(reviewer) if cfg.reconciler.enabled => Some(Reconciler::new(
                reviewer.clone(),
                cfg.reconciler.interval_cycles,
                max_fixes,
            )),
            _ => None,
        };

        let mut arena = PlannerArena::new();
        arena.open_root(description);

        let job_id = uuid::Uuid::new_v4().to_string();
        info!(job_id = %job_id, ceiling = ctl.revision_ceiling(), "job started");
        ctl.events.emit(JobEvent::new(EventType::JobStarted).data(json!({
            "job_id": job_id,
            "description": preview(description),
            "revision_ceiling": ctl.revision_ceiling(),
        })));

        Self {
            ctl,
            job_id,
            phase: JobPhase::Planning,
            graph: TaskGraph::with_router(router),
            arena,
            dispatcher,
            gate: ReviewGate::new(ctl.capabilities.reviewer.clone(), max_fixes),
            reconciler,
            budget: RevisionBudget::new(ctl.revision_ceiling()),
            store: ArtifactStore::new(),
            handoffs: Vec::new(),
            unreviewed: Vec::new(),
            direct_queue: Vec::new(),
            cycles: 0,
            waves: 0,
            ceiling_hit: false,
            unresolved_review: false,
        }
    }

    fn emit(&self, event: JobEvent) {
        self.ctl.events.emit(event);
    }

    fn transition(&mut self, to: JobPhase) -> Result<(), ProtocolError> {
        PhaseTransition::validate(self.phase, to)?;
        debug!(job_id = %self.job_id, from = %self.phase, to = %to, "phase transition");
        self.phase = to;
        Ok(())
    }

    async fn drive(&mut self) -> Result<(), ProtocolError> {
        loop {
            match self.phase {
                JobPhase::Planning => {
                    self.plan().await?;
                    self.transition(JobPhase::Dispatching)?;
                }
                JobPhase::Dispatching => {
                    self.dispatch().await?;
                    self.transition(JobPhase::Reviewing)?;
                }
                JobPhase::Reviewing => {
                    let next = self.review().await?;
                    self.transition(next)?;
                }
                JobPhase::Done => return Ok(()),
            }
        }
    }

    // ---- planning ----

    async fn plan(&mut self) -> Result<(), ProtocolError> {
        for key in self.arena.active_keys() {
            self.plan_turn(&key).await?;
        }
        Ok(())
    }

    fn planner_for(&self, key: &ConversationKey) -> Arc<dyn PlannerPlugin> {
        let caps = &self.ctl.capabilities;
        match key {
            ConversationKey::Root => caps.planner.clone(),
            ConversationKey::Task(_) => caps
                .subplanner
                .clone()
                .unwrap_or_else(|| caps.planner.clone()),
        }
    }

    /// One planner turn for `key`, retried with corrective feedback until a
    /// batch is admitted or the retry budget runs out.
    async fn plan_turn(&mut self, key: &ConversationKey) -> Result<(), ProtocolError> {
        let planner_cfg = &self.ctl.config.planner;
        let max_batch = planner_cfg.max_batch_size;
        let max_turns = planner_cfg.max_turns;
        let capability = match key {
            ConversationKey::Root => "planner",
            ConversationKey::Task(_) => "subplanner",
        };

        let turns = match self.arena.get(key) {
            Some(conv) => conv.turns,
            None => return Ok(()),
        };
        if turns >= max_turns {
            warn!(conversation = %key, turns, "turn budget exhausted");
            if let Some(conv) = self.arena.get_mut(key) {
                conv.state = ConversationState::Finished;
                conv.concerns
                    .push(format!("planner stopped after the turn budget of {max_turns}"));
            }
            return Ok(());
        }

        let planner = self.planner_for(key);
        let tree = self.store.paths();
        let mut feedback: Option<String> = None;
        let mut attempt = 0u32;

        loop {
            let request = match self.arena.get(key) {
                Some(conv) => conv.request(max_batch, feedback.clone(), &tree),
                None => return Ok(()),
            };
            self.emit(JobEvent::new(EventType::PlanningTurn).data(json!({
                "conversation": key.to_string(),
                "turn": request.turn,
                "attempt": attempt,
            })));

            let rejection = match planner.next_batch(&request).await {
                Err(e) => format!("{capability} call failed: {e:#}"),
                Ok(batch) if batch.len() > max_batch => {
                    let err = ProtocolError::BatchTooLarge {
                        size: batch.len(),
                        limit: max_batch,
                    };
                    self.reject(key, "batch_too_large", &err.to_string());
                    format!("{err}. Split the work and return at most {max_batch} tasks.")
                }
                Ok(batch) if batch.is_empty() => {
                    self.close_conversation(key, batch.scratchpad);
                    return Ok(());
                }
                Ok(batch) => match self.bind_and_admit(key, batch) {
                    Ok(()) => return Ok(()),
                    Err((code, message)) => {
                        self.reject(key, code, &message);
                        format!("Batch rejected ({code}): {message}. Resubmit a corrected batch.")
                    }
                },
            };

            match self.ctl.retry.next_delay(attempt) {
                Some(delay) => {
                    warn!(conversation = %key, attempt, error = %rejection, "planner turn rejected, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    feedback = Some(rejection);
                }
                None => {
                    return Err(ProtocolError::RetriesExhausted {
                        capability: capability.to_string(),
                        attempts: attempt + 1,
                        last_error: rejection,
                    })
                }
            }
        }
    }

    fn reject(&self, key: &ConversationKey, code: &str, message: &str) {
        warn!(conversation = %key, code, "batch rejected: {message}");
        self.emit(JobEvent::new(EventType::BatchRejected).data(json!({
            "conversation": key.to_string(),
            "code": code,
            "error": message,
        })));
    }

    /// Attach lineage to a batch and admit it. Errors are `(code, message)`.
    fn bind_and_admit(
        &mut self,
        key: &ConversationKey,
        mut batch: Batch,
    ) -> Result<(), (&'static str, String)> {
        match key {
            ConversationKey::Root => {
                for task in &mut batch.tasks {
                    task.parent_id = None;
                }
            }
            ConversationKey::Task(parent_id) => {
                let parent = self
                    .graph
                    .get(parent_id)
                    .cloned()
                    .ok_or_else(|| ("unknown_task", format!("unknown parent '{parent_id}'")))?;
                prepare_children(&parent, &mut batch).map_err(|e| (e.code(), e.to_string()))?;
            }
        }

        let ids = self
            .graph
            .admit(&batch)
            .map_err(|e| (e.code(), e.to_string()))?;

        info!(conversation = %key, tasks = ids.len(), "batch admitted");
        self.emit(JobEvent::new(EventType::BatchAdmitted).data(json!({
            "conversation": key.to_string(),
            "tasks": ids,
        })));
        let tree = self.store.paths();
        if let Some(conv) = self.arena.get_mut(key) {
            conv.complete_turn(batch.scratchpad, ids, tree);
        }
        Ok(())
    }

    /// An empty batch ends the conversation. A subplanner that returns nothing
    /// on its first turn hands the task back for direct execution.
    fn close_conversation(&mut self, key: &ConversationKey, scratchpad: String) {
        let tree = self.store.paths();
        let Some(conv) = self.arena.get_mut(key) else {
            return;
        };
        let first_turn = conv.turns == 0;
        conv.complete_turn(scratchpad, Vec::new(), tree);

        match key {
            ConversationKey::Task(id) if first_turn => {
                conv.state = ConversationState::Atomic;
                if let Some(task) = self.graph.get(id).cloned() {
                    debug!(task_id = %id, "subplanner declined, executing directly");
                    self.direct_queue.push(task);
                }
            }
            _ => {
                conv.state = ConversationState::Finished;
                debug!(conversation = %key, "planner finished");
            }
        }
    }

    // ---- dispatching ----

    async fn dispatch(&mut self) -> Result<(), ProtocolError> {
        self.settle().await?;
        loop {
            let mut wave: Vec<Task> = std::mem::take(&mut self.direct_queue);

            for task in self.graph.ready_tasks() {
                self.graph.mark_dispatched(&task.id)?;
                self.emit(JobEvent::for_task(EventType::TaskDispatched, &task));

                if self.delegate(&task) {
                    continue;
                }
                wave.push(task);
            }

            if wave.is_empty() {
                return Ok(());
            }

            self.waves += 1;
            let tree = file_tree(&self.store.paths());
            let requests = wave
                .into_iter()
                .map(|t| self.work_request(t, &tree))
                .collect();
            let handoffs = self.dispatcher.run_wave(self.waves, requests).await;
            for handoff in handoffs {
                self.record(handoff).await?;
            }
            self.settle().await?;
        }
    }

    /// Pair `task` with the project tree and the current content of its scope.
    fn work_request(&self, task: Task, tree: &[String]) -> WorkRequest {
        let files = scoped_contents(&self.store, &task.scope);
        WorkRequest::new(task).with_context(tree.to_vec(), files)
    }

    /// Hand `task` to a subplanner when delegation is configured and the task
    /// is worth decomposing.
    fn delegate(&mut self, task: &Task) -> bool {
        if self.ctl.capabilities.subplanner.is_none() {
            return false;
        }
        let depth = self.graph.depth(&task.id);
        if !self.ctl.subplan.should_decompose(task, depth) {
            return false;
        }
        self.arena.open_delegated(task, depth);
        info!(task_id = %task.id, depth, "subplanner started");
        self.emit(
            JobEvent::for_task(EventType::SubplannerStarted, task)
                .data(json!({ "depth": depth + 1 })),
        );
        true
    }

    /// Apply a worker or aggregated handoff and fan it out to the artifact
    /// store, the sink and the planning conversation that owns the task.
    async fn record(&mut self, handoff: Handoff) -> Result<(), ProtocolError> {
        let task = self
            .graph
            .get(&handoff.task_id)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownTask(handoff.task_id.clone()))?;
        let status = self.graph.apply_handoff(handoff.clone())?;

        let kept = self.store.record_handoff(&task, &handoff);
        if let Some(sink) = &self.ctl.artifact_sink {
            for artifact in &kept {
                if let Err(e) = sink.write(artifact).await {
                    warn!(task_id = %task.id, path = %artifact.path, error = %format!("{e:#}"), "artifact sink write failed");
                }
            }
        }

        let event_type = match status {
            TaskStatus::Blocked => EventType::TaskBlocked,
            _ => EventType::TaskCompleted,
        };
        self.emit(
            JobEvent::for_task(event_type, &task)
                .status(handoff.status.as_str())
                .data(json!({
                    "artifacts": kept.len(),
                    "concerns": handoff.concerns,
                    "revision": task.revision,
                })),
        );
        debug!(task_id = %task.id, status = %status, "handoff applied");

        self.arena.route_handoff(task.parent_id.as_deref(), &handoff);
        self.unreviewed.push(task.id.clone());
        self.handoffs.push(handoff);
        Ok(())
    }

    /// Block tasks behind failures and resolve finished delegations until
    /// nothing changes.
    async fn settle(&mut self) -> Result<(), ProtocolError> {
        loop {
            let blocked = self.graph.block_unreachable();
            for handoff in &blocked {
                if let Some(task) = self.graph.get(&handoff.task_id) {
                    info!(task_id = %task.id, "task blocked by failed dependency");
                    self.emit(
                        JobEvent::for_task(EventType::TaskBlocked, task)
                            .status(handoff.status.as_str())
                            .data(json!({ "concerns": handoff.concerns })),
                    );
                    let parent_id = task.parent_id.clone();
                    self.arena.route_handoff(parent_id.as_deref(), handoff);
                }
            }
            let any_blocked = !blocked.is_empty();
            self.handoffs.extend(blocked);

            let resolved = self.resolve_delegations().await?;
            if !any_blocked && !resolved {
                return Ok(());
            }
        }
    }

    async fn resolve_delegations(&mut self) -> Result<bool, ProtocolError> {
        let mut resolved = false;
        for parent_id in self.arena.finished_delegations() {
            let key = ConversationKey::Task(parent_id.clone());
            let Some(conv) = self.arena.get(&key) else {
                continue;
            };
            let all_terminal = conv.children.iter().all(|c| {
                self.graph
                    .status(c)
                    .is_some_and(|s| s.is_terminal())
            });
            if !all_terminal {
                continue;
            }

            let parent = self
                .graph
                .get(&parent_id)
                .cloned()
                .ok_or_else(|| ProtocolError::UnknownTask(parent_id.clone()))?;
            let children: Vec<&Task> = conv
                .children
                .iter()
                .filter_map(|c| self.graph.get(c))
                .collect();
            let uncovered = uncovered_scope(&parent, children.iter().copied());
            let mut aggregated =
                aggregate_handoffs(&parent, conv.children.len(), &conv.received, &uncovered);
            aggregated.concerns.extend(conv.concerns.iter().cloned());

            if let Some(conv) = self.arena.get_mut(&key) {
                conv.state = ConversationState::Resolved;
            }
            info!(task_id = %parent_id, status = %aggregated.status, "delegation resolved");
            self.record(aggregated).await?;
            resolved = true;
        }
        Ok(resolved)
    }

    // ---- reviewing ----

    async fn review(&mut self) -> Result<JobPhase, ProtocolError> {
        self.cycles += 1;
        let mut fixes_admitted = false;

        let reviewed = self.take_reviewable();
        if !reviewed.is_empty() {
            let request = self.gate_request(&reviewed);
            let graph = &self.graph;
            let result = self
                .gate
                .review(&request, &mut self.budget, &self.ctl.retry, &|id: &str| {
                    graph.contains(id)
                })
                .await?;
            fixes_admitted = self.apply_review(ReviewKind::Gate, result);
        }

        if !fixes_admitted && !self.ceiling_hit {
            let due = self
                .reconciler
                .as_ref()
                .is_some_and(|r| r.is_due(self.cycles));
            if due {
                let request = self.reconcile_request();
                let graph = &self.graph;
                if let Some(reconciler) = self.reconciler.as_mut() {
                    let result = reconciler
                        .sweep(&request, &mut self.budget, &self.ctl.retry, &|id: &str| {
                            graph.contains(id)
                        })
                        .await?;
                    fixes_admitted = self.apply_review(ReviewKind::Reconcile, result);
                }
            }
        }

        if self.ceiling_hit {
            return Ok(JobPhase::Done);
        }
        if fixes_admitted || self.arena.has_active() {
            return Ok(JobPhase::Planning);
        }
        if !self.direct_queue.is_empty() || !self.graph.ready_tasks().is_empty() {
            return Ok(JobPhase::Planning);
        }
        let outstanding = self.graph.outstanding_count();
        if outstanding == 0 {
            return Ok(JobPhase::Done);
        }
        Err(ProtocolError::Stalled { outstanding })
    }

    /// Newly terminal tasks that did work. Blocked tasks and resolved
    /// delegations are skipped; their children were reviewed directly.
    fn take_reviewable(&mut self) -> Vec<TaskId> {
        let pending = std::mem::take(&mut self.unreviewed);
        pending
            .into_iter()
            .filter(|id| {
                matches!(
                    self.graph.status(id),
                    Some(TaskStatus::Complete | TaskStatus::Failed)
                )
            })
            .filter(|id| {
                !matches!(
                    self.arena.get(&ConversationKey::Task(id.clone())).map(|c| c.state),
                    Some(ConversationState::Resolved)
                )
            })
            .collect()
    }

    fn gate_request(&self, reviewed: &[TaskId]) -> ReviewRequest {
        let mut scope = BTreeSet::new();
        let mut criteria = Vec::new();
        let mut handoffs = Vec::new();
        for id in reviewed {
            if let Some(task) = self.graph.get(id) {
                scope.extend(task.scope.iter().cloned());
                if !task.acceptance.is_empty() && !criteria.contains(&task.acceptance) {
                    criteria.push(task.acceptance.clone());
                }
            }
            if let Some(h) = self.graph.handoff(id) {
                handoffs.push(h.clone());
            }
        }

        let ids: BTreeSet<TaskId> = reviewed.iter().cloned().collect();
        let mut artifacts = self.store.within_scope(&scope);
        for artifact in self.store.written_by(&ids) {
            artifacts
                .entry(artifact.path.clone())
                .or_insert_with(|| artifact.clone());
        }

        ReviewRequest {
            kind: ReviewKind::Gate,
            scope,
            artifacts,
            criteria,
            handoffs,
            revision: self.budget.current(),
        }
    }

    fn reconcile_request(&self) -> ReviewRequest {
        let artifacts: BTreeMap<_, _> = self.store.snapshot();
        let mut criteria = Vec::new();
        for task in self.graph.tasks_by_status(TaskStatus::Complete) {
            if !task.acceptance.is_empty() && !criteria.contains(&task.acceptance) {
                criteria.push(task.acceptance.clone());
            }
        }
        ReviewRequest {
            kind: ReviewKind::Reconcile,
            scope: artifacts.keys().cloned().collect(),
            artifacts,
            criteria,
            handoffs: Vec::new(),
            revision: self.budget.current(),
        }
    }

    /// Returns true when a fix batch was admitted. A fix batch the graph
    /// refuses gives its revision back and leaves the review unresolved.
    fn apply_review(&mut self, kind: ReviewKind, result: ReviewResult) -> bool {
        match result {
            ReviewResult::Pass { notes } => {
                debug!(?kind, notes = notes.len(), "review passed");
                self.emit(JobEvent::new(EventType::ReviewPassed).data(json!({
                    "kind": kind,
                    "notes": notes.len(),
                    "revision": self.budget.current(),
                })));
                false
            }
            ReviewResult::Fail {
                revision,
                fix_tasks,
                defects,
            } => {
                let event_type = match kind {
                    ReviewKind::Gate => EventType::ReviewFailed,
                    ReviewKind::Reconcile => EventType::ReconcilerIssue,
                };
                let severities: Vec<&str> = defects.iter().map(|d| d.severity.as_str()).collect();

                let mut fixes = fix_tasks;
                for fix in &mut fixes {
                    self.graph.order_after_conflicts(fix);
                }
                let batch = Batch::new(String::new(), fixes);
                match self.graph.admit(&batch) {
                    Ok(ids) => {
                        info!(?kind, revision, fixes = ids.len(), "fix batch admitted");
                        self.emit(JobEvent::new(event_type).data(json!({
                            "revision": revision,
                            "defects": severities,
                            "fixes": ids,
                        })));
                        true
                    }
                    Err(e) => {
                        warn!(?kind, revision, error = %e, "fix batch rejected");
                        self.budget.release(revision);
                        self.unresolved_review = true;
                        self.emit(JobEvent::new(event_type).data(json!({
                            "revision": revision,
                            "defects": severities,
                            "fixes": [],
                            "rejected": e.code(),
                        })));
                        self.emit(JobEvent::new(EventType::BatchRejected).data(json!({
                            "conversation": "review",
                            "code": e.code(),
                            "error": e.to_string(),
                        })));
                        false
                    }
                }
            }
            ReviewResult::Exhausted { ceiling, defects } => {
                warn!(ceiling, defects = defects.len(), "revision ceiling reached");
                self.emit(JobEvent::new(EventType::RevisionLimitReached).data(json!({
                    "ceiling": ceiling,
                    "defects": defects.len(),
                })));
                self.ceiling_hit = true;
                false
            }
        }
    }

    // ---- outcome ----

    /// Any failed or blocked task, or an unresolved review, makes the job
    /// `Partial` even when later fixes passed review.
    fn finish(self, result: Result<(), ProtocolError>) -> JobOutcome {
        let completed = self.graph.completed_ids().len();
        let (status, error) = match result {
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "job aborted");
                let status = if completed == 0 {
                    JobStatus::Failed
                } else {
                    JobStatus::Partial
                };
                (status, Some(e.to_string()))
            }
            Ok(()) if self.ceiling_hit => (JobStatus::Partial, None),
            Ok(()) if self.graph.is_empty() => (
                JobStatus::Failed,
                Some("planner produced no tasks".to_string()),
            ),
            Ok(()) if completed == 0 => (JobStatus::Failed, None),
            Ok(()) if self.unresolved_review => (JobStatus::Partial, None),
            Ok(()) if completed < self.graph.len() => (JobStatus::Partial, None),
            Ok(()) => (JobStatus::Success, None),
        };
        info!(
            job_id = %self.job_id,
            status = %status,
            revision = self.budget.current(),
            cycles = self.cycles,
            waves = self.waves,
            "job done"
        );
        self.emit(
            JobEvent::new(EventType::JobDone)
                .status(status.as_str())
                .data(json!({
                    "job_id": self.job_id,
                    "revision": self.budget.current(),
                    "cycles": self.cycles,
                    "waves": self.waves,
                    "artifacts": self.store.len(),
                    "error": error,
                })),
        );

        JobOutcome {
            job_id: self.job_id,
            status,
            artifacts: self.store.snapshot(),
            revision: self.budget.current(),
            handoffs: self.handoffs,
            error,
            cycles: self.cycles,
            waves: self.waves,
        }
    }
}
