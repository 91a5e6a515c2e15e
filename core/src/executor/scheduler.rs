use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::router::{DepartmentRouter, WorkerPools};
use super::traits::{WorkRequest, WorkerPlugin};
use super::types::{Handoff, TaskId};
use crate::error::{ProtocolError, WorkerFailure};
use crate::events_out::{EventSink, EventType, JobEvent, NoopSink};

/// Runs one wave of ready tasks concurrently and collects a handoff for each.
///
/// Never touches the task graph; the caller applies the returned handoffs.
pub struct Dispatcher {
    pools: WorkerPools,
    router: DepartmentRouter,
    max_parallel: usize,
    task_timeout: Option<Duration>,
    events: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(pools: WorkerPools, router: DepartmentRouter) -> Self {
        Self {
            pools,
            router,
            max_parallel: 10,
            task_timeout: None,
            events: Arc::new(NoopSink),
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Execute every request in `requests`. Returns one handoff per task, in completion order.
    ///
    /// A worker that errors, panics, times out or reports the wrong task id
    /// yields a failed handoff for that task only.
    pub async fn run_wave(&self, wave: usize, requests: Vec<WorkRequest>) -> Vec<Handoff> {
        let sem = Arc::new(Semaphore::new(self.max_parallel));
        let mut set: JoinSet<(TaskId, Result<Handoff, WorkerFailure>)> = JoinSet::new();
        let expected: Vec<TaskId> = requests.iter().map(|r| r.task.id.clone()).collect();

        debug!(wave, tasks = requests.len(), "wave started");

        for request in requests {
            let pool = self.router.classify(&request.task);
            let worker = self.pools.worker_for(pool);
            let sem = sem.clone();
            let events = self.events.clone();
            let timeout = self.task_timeout;

            set.spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        return (
                            request.task.id.clone(),
                            Err(WorkerFailure::Execution("semaphore closed unexpectedly".into())),
                        )
                    }
                };

                let task = &request.task;
                events.emit(
                    JobEvent::for_task(EventType::TaskStarted, task)
                        .data(serde_json::json!({ "wave": wave, "pool": pool.to_string() })),
                );

                let started = Instant::now();
                let result = invoke(worker.as_ref(), &request, timeout).await;
                let result = result.and_then(|mut handoff| {
                    if handoff.task_id != task.id {
                        return Err(WorkerFailure::Protocol(ProtocolError::HandoffMismatch {
                            expected: task.id.clone(),
                            got: handoff.task_id,
                        }));
                    }
                    if handoff.metrics.duration_ms == 0 {
                        handoff.metrics.duration_ms = started.elapsed().as_millis() as u64;
                    }
                    Ok(handoff)
                });
                (task.id.clone(), result)
            });
        }

        let mut handoffs = Vec::with_capacity(expected.len());
        let mut seen: HashSet<TaskId> = HashSet::new();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((task_id, Ok(handoff))) => {
                    seen.insert(task_id);
                    handoffs.push(handoff);
                }
                Ok((task_id, Err(failure))) => {
                    warn!(task_id = %task_id, wave, error = %failure, "worker failed");
                    handoffs.push(Handoff::failed(task_id.clone(), failure.to_string()));
                    seen.insert(task_id);
                }
                Err(e) => {
                    warn!(wave, error = %e, "worker task aborted");
                }
            }
        }

        // Anything still missing was lost with its join handle.
        for task_id in expected {
            if !seen.contains(&task_id) {
                handoffs.push(Handoff::failed(
                    task_id,
                    "worker invocation was cancelled before reporting",
                ));
            }
        }

        debug!(wave, handoffs = handoffs.len(), "wave finished");
        handoffs
    }
}

async fn invoke(
    worker: &dyn WorkerPlugin,
    request: &WorkRequest,
    timeout: Option<Duration>,
) -> Result<Handoff, WorkerFailure> {
    let call = AssertUnwindSafe(worker.execute(request)).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(WorkerFailure::Timeout(limit.as_millis() as u64)),
        },
        None => call.await,
    };
    match outcome {
        Ok(Ok(handoff)) => Ok(handoff),
        Ok(Err(e)) => Err(WorkerFailure::Execution(format!("{e:#}"))),
        Err(panic) => Err(WorkerFailure::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
