use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use swarm_core::api::{extract_json, CommandConfig, Defect, ReviewRequest, ReviewerPlugin};

use crate::process::run_json_command;

/// Reviewer backed by an external command: `ReviewRequest` JSON on stdin,
/// a defect list (bare or under `"defects"`) on stdout.
pub struct CommandReviewerPlugin {
    cfg: CommandConfig,
}

impl CommandReviewerPlugin {
    pub fn new(cfg: CommandConfig) -> Self {
        Self { cfg }
    }
}

#[derive(Deserialize)]
struct DefectReport {
    #[serde(default)]
    defects: Vec<Defect>,
}

fn parse_defects(text: &str) -> Result<Vec<Defect>> {
    let value = extract_json(text)?;
    let defects = match value {
        Value::Array(_) => serde_json::from_value(value),
        other => serde_json::from_value::<DefectReport>(other).map(|r| r.defects),
    };
    defects.context("reviewer reply is not a defect list")
}

#[async_trait]
impl ReviewerPlugin for CommandReviewerPlugin {
    fn name(&self) -> &str {
        "command"
    }

    async fn inspect(&self, request: &ReviewRequest) -> Result<Vec<Defect>> {
        let stdout = run_json_command(&self.cfg, request).await?;
        parse_defects(&stdout)
    }
}
