use anyhow::Result;
use async_trait::async_trait;
use swarm_core::api::{parse_planner_response, Batch, CommandConfig, PlanRequest, PlannerPlugin};

use super::id_prefix;
use crate::process::run_json_command;

/// Planner backed by an external command: `PlanRequest` JSON on stdin, free-form reply on stdout.
pub struct CommandPlannerPlugin {
    cfg: CommandConfig,
}

impl CommandPlannerPlugin {
    pub fn new(cfg: CommandConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl PlannerPlugin for CommandPlannerPlugin {
    fn name(&self) -> &str {
        "command"
    }

    async fn next_batch(&self, request: &PlanRequest) -> Result<Batch> {
        let stdout = run_json_command(&self.cfg, request).await?;
        tracing::debug!(
            cmd = %self.cfg.cmd,
            depth = request.depth,
            turn = request.turn,
            bytes = stdout.len(),
            "planner replied"
        );
        Ok(parse_planner_response(&stdout, &id_prefix(request))?)
    }
}
