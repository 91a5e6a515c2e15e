#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swarm_core::api::{
    AppConfig, Batch, Capabilities, Defect, EventLog, EventType, Handoff, JobController,
    Objective, PlanRequest, PlannerPlugin, RetryPolicy, ReviewRequest, ReviewerPlugin, Severity,
    Task, WorkRequest, WorkerPlugin, WorkerPools,
};

/// Replays fixed batches. Root turns pop from `root`; delegated tasks pop
/// from their own queue. An exhausted queue yields an empty batch.
#[derive(Default)]
pub struct ScriptedPlanner {
    root: Mutex<VecDeque<Batch>>,
    delegated: Mutex<HashMap<String, VecDeque<Batch>>>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedPlanner {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self {
            root: Mutex::new(batches.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn for_task(self, task_id: &str, batches: Vec<Batch>) -> Self {
        self.delegated
            .lock()
            .unwrap()
            .insert(task_id.to_string(), batches.into_iter().collect());
        self
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlannerPlugin for ScriptedPlanner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn next_batch(&self, request: &PlanRequest) -> anyhow::Result<Batch> {
        self.requests.lock().unwrap().push(request.clone());
        let next = match &request.objective {
            Objective::Job { .. } => self.root.lock().unwrap().pop_front(),
            Objective::Task { task } => self
                .delegated
                .lock()
                .unwrap()
                .get_mut(&task.id)
                .and_then(VecDeque::pop_front),
        };
        Ok(next.unwrap_or_else(|| Batch::done("done")))
    }
}

/// Planner whose every call errors.
pub struct BrokenPlanner;

#[async_trait]
impl PlannerPlugin for BrokenPlanner {
    fn name(&self) -> &str {
        "broken"
    }

    async fn next_batch(&self, _request: &PlanRequest) -> anyhow::Result<Batch> {
        anyhow::bail!("model endpoint unavailable")
    }
}

/// Completes every task by writing one line to each scoped path.
#[derive(Default)]
pub struct StubWorker {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I: IntoIterator<Item = &'static str>>(ids: I) -> Self {
        Self {
            failing: ids.into_iter().map(String::from).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerPlugin for StubWorker {
    fn name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, request: &WorkRequest) -> anyhow::Result<Handoff> {
        let task = &request.task;
        self.calls.lock().unwrap().push(task.id.clone());
        if self.failing.contains(&task.id) {
            anyhow::bail!("worker crashed on {}", task.id);
        }
        Ok(write_scope(task))
    }
}

fn write_scope(task: &Task) -> Handoff {
    let mut handoff = Handoff::complete(task.id.clone(), format!("did {}", task.id));
    for path in &task.scope {
        if !path.ends_with('/') {
            handoff = handoff.with_artifact(path.clone(), format!("# written by {}\n", task.id));
        }
    }
    handoff
}

/// One worker invocation as seen by [`RecordingWorker`].
#[derive(Debug, Clone)]
pub struct Invocation {
    pub wave: u64,
    pub task_id: String,
    pub scope: BTreeSet<String>,
    pub request: WorkRequest,
}

/// Behaves like [`StubWorker`] and records the wave, scope and request of
/// every call. The wave is read from the `task_started` event the dispatcher
/// emits just before invoking the worker.
pub struct RecordingWorker {
    log: EventLog,
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingWorker {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation(&self, task_id: &str) -> Option<Invocation> {
        self.invocations()
            .into_iter()
            .find(|i| i.task_id == task_id)
    }

    fn current_wave(&self, task_id: &str) -> u64 {
        self.log
            .events()
            .iter()
            .rev()
            .find(|e| {
                e.event_type == EventType::TaskStarted && e.task_id.as_deref() == Some(task_id)
            })
            .and_then(|e| e.data["wave"].as_u64())
            .unwrap_or(0)
    }
}

#[async_trait]
impl WorkerPlugin for RecordingWorker {
    fn name(&self) -> &str {
        "recording"
    }

    async fn execute(&self, request: &WorkRequest) -> anyhow::Result<Handoff> {
        let task = &request.task;
        let invocation = Invocation {
            wave: self.current_wave(&task.id),
            task_id: task.id.clone(),
            scope: task.scope.clone(),
            request: request.clone(),
        };
        self.invocations.lock().unwrap().push(invocation);
        Ok(write_scope(task))
    }
}

/// Reports a crash defect on the first `failures` inspections, then passes.
pub struct FailingReviewer {
    failures: u32,
    every_artifact: bool,
    scope: Option<Vec<String>>,
    calls: AtomicU32,
}

impl FailingReviewer {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            every_artifact: false,
            scope: None,
            calls: AtomicU32::new(0),
        }
    }

    /// One defect per reviewed artifact instead of one in total.
    pub fn on_every_artifact(mut self) -> Self {
        self.every_artifact = true;
        self
    }

    /// Report the defect against fixed paths instead of reviewed artifacts.
    pub fn scoped_to<I: IntoIterator<Item = &'static str>>(mut self, paths: I) -> Self {
        self.scope = Some(paths.into_iter().map(String::from).collect());
        self
    }

    pub fn passing() -> Self {
        Self::new(0)
    }

    pub fn always() -> Self {
        Self::new(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewerPlugin for FailingReviewer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn inspect(&self, request: &ReviewRequest) -> anyhow::Result<Vec<Defect>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.failures {
            return Ok(Vec::new());
        }
        let mut paths: Vec<String> = match &self.scope {
            Some(scope) => scope.clone(),
            None => request.artifacts.keys().cloned().collect(),
        };
        if paths.is_empty() {
            paths.push("main.py".to_string());
        }
        if !self.every_artifact {
            paths.truncate(1);
        }
        Ok(paths
            .into_iter()
            .map(|path| {
                Defect::new(Severity::Crash, format!("{path} raises on import")).with_scope([path])
            })
            .collect())
    }
}

/// Reviewer whose every call errors.
pub struct BrokenReviewer;

#[async_trait]
impl ReviewerPlugin for BrokenReviewer {
    fn name(&self) -> &str {
        "broken"
    }

    async fn inspect(&self, _request: &ReviewRequest) -> anyhow::Result<Vec<Defect>> {
        anyhow::bail!("reviewer timed out")
    }
}

pub fn capabilities(
    planner: Arc<dyn PlannerPlugin>,
    worker: Arc<dyn WorkerPlugin>,
    reviewer: Arc<dyn ReviewerPlugin>,
) -> Capabilities {
    Capabilities::new(planner, WorkerPools::new(worker), reviewer)
}

/// Controller with instant retries and an in-memory event log.
pub fn controller(caps: Capabilities, config: AppConfig) -> (JobController, EventLog) {
    let log = EventLog::new();
    let ctl = controller_with_log(caps, config, &log);
    (ctl, log)
}

/// Controller reporting to an existing log, for workers that read it.
pub fn controller_with_log(
    caps: Capabilities,
    config: AppConfig,
    log: &EventLog,
) -> JobController {
    JobController::new(caps, config)
        .with_retry_policy(RetryPolicy::new(3, 0, 0))
        .with_events(Arc::new(log.clone()))
}
