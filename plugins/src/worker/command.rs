use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use swarm_core::api::{parse_worker_response, CommandConfig, Handoff, WorkRequest, WorkerPlugin};

use crate::process::run_json_command;

/// Worker backed by an external command: `WorkRequest` JSON on stdin,
/// `{handoff, file_operations}` on stdout.
pub struct CommandWorkerPlugin {
    cfg: CommandConfig,
}

impl CommandWorkerPlugin {
    pub fn new(cfg: CommandConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl WorkerPlugin for CommandWorkerPlugin {
    fn name(&self) -> &str {
        "command"
    }

    async fn execute(&self, request: &WorkRequest) -> Result<Handoff> {
        let task = &request.task;
        let started = Instant::now();
        let stdout = run_json_command(&self.cfg, request).await?;
        let mut handoff = parse_worker_response(&stdout, &task.id);
        handoff.metrics.duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            task_id = %task.id,
            status = %handoff.status,
            files = handoff.artifacts.len(),
            "worker replied"
        );
        Ok(handoff)
    }
}
