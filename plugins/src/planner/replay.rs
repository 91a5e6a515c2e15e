use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use swarm_core::api::{parse_planner_response, Batch, Objective, PlanRequest, PlannerPlugin};
use tokio::sync::OnceCell;

use super::id_prefix;

/// Replays recorded planner replies from a JSON file, one per root turn.
///
/// The file holds either an array of replies or `{"turns": [...]}`. A reply is
/// a planner object or a string with the raw planner text. Turns past the end
/// and every delegated objective get an empty batch.
pub struct ReplayPlannerPlugin {
    plan_file: String,
    turns: OnceCell<Vec<String>>,
}

impl ReplayPlannerPlugin {
    pub fn new(plan_file: String) -> Self {
        Self {
            plan_file,
            turns: OnceCell::new(),
        }
    }

    async fn turns(&self) -> Result<&Vec<String>> {
        self.turns
            .get_or_try_init(|| async {
                let path = shellexpand::tilde(&self.plan_file).to_string();
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("read plan file {path}"))?;
                load_turns(&content).with_context(|| format!("parse plan file {path}"))
            })
            .await
    }
}

fn load_turns(content: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(content)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("turns") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("expected a \"turns\" array"),
        },
        _ => anyhow::bail!("expected an array of planner replies"),
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .collect())
}

#[async_trait]
impl PlannerPlugin for ReplayPlannerPlugin {
    fn name(&self) -> &str {
        "replay"
    }

    async fn next_batch(&self, request: &PlanRequest) -> Result<Batch> {
        if matches!(request.objective, Objective::Task { .. }) {
            return Ok(Batch::done(""));
        }
        let turns = self.turns().await?;
        match turns.get(request.turn as usize) {
            Some(reply) => Ok(parse_planner_response(reply, &id_prefix(request))?),
            None => Ok(Batch::done(request.scratchpad.clone())),
        }
    }
}
